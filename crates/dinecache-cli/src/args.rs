//! Command-line argument parsing.

use anyhow::{anyhow, bail, Result};
use dinecache_core::Filter;

pub const USAGE: &str = "\
Usage: dinecache [--offline] <command>

Commands:
  list [--cuisine C|all] [--neighborhood N|all] [--favorites|--all] [--json]
  cuisines                       List cuisines
  neighborhoods                  List neighborhoods
  show <id> [--json]             Show a restaurant with its reviews
  favorite <id>                  Toggle a restaurant's favorite flag
  review <id> <name> <rating> <comments...>
                                 Add a review (rating 0-5)
  sync                           Send reviews saved while offline
  status                         Show local catalog status
  help                           Show this message

Options:
  --offline                      Queue new reviews locally instead of posting them
                                 (reads still fetch what the local database lacks)";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Filters left as `None` fall back to the ones saved in config
    List {
        cuisine: Option<Filter>,
        neighborhood: Option<Filter>,
        favorites_only: Option<bool>,
        json: bool,
    },
    Cuisines,
    Neighborhoods,
    Show {
        id: i64,
        json: bool,
    },
    Favorite {
        id: i64,
    },
    Review {
        id: i64,
        name: String,
        rating: String,
        comments: String,
    },
    Sync,
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub offline: bool,
    pub command: Command,
}

impl Invocation {
    /// Parse arguments without the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut offline = false;
        let mut rest = args;
        while let Some(first) = rest.first() {
            match first.as_str() {
                "--offline" => offline = true,
                "-h" | "--help" => {
                    return Ok(Self {
                        offline,
                        command: Command::Help,
                    })
                }
                _ => break,
            }
            rest = &rest[1..];
        }

        let (name, rest) = match rest.split_first() {
            Some((name, rest)) => (name.as_str(), rest),
            None => ("list", rest),
        };

        let command = match name {
            "list" => parse_list(rest)?,
            "cuisines" => no_args(Command::Cuisines, rest)?,
            "neighborhoods" => no_args(Command::Neighborhoods, rest)?,
            "show" => {
                let (id, rest) = take_id(rest)?;
                let json = match rest {
                    [] => false,
                    [flag] if flag == "--json" => true,
                    _ => bail!("Unexpected arguments: {}", rest.join(" ")),
                };
                Command::Show { id, json }
            }
            "favorite" => {
                let (id, rest) = take_id(rest)?;
                no_args(Command::Favorite { id }, rest)?
            }
            "review" => {
                let (id, rest) = take_id(rest)?;
                match rest {
                    [name, rating, comments @ ..] if !comments.is_empty() => Command::Review {
                        id,
                        name: name.clone(),
                        rating: rating.clone(),
                        comments: comments.join(" "),
                    },
                    _ => bail!("review needs <id> <name> <rating> <comments...>"),
                }
            }
            "sync" => no_args(Command::Sync, rest)?,
            "status" => no_args(Command::Status, rest)?,
            "help" => Command::Help,
            other => bail!("Unknown command: {}", other),
        };

        Ok(Self { offline, command })
    }
}

fn parse_list(args: &[String]) -> Result<Command> {
    let mut cuisine = None;
    let mut neighborhood = None;
    let mut favorites_only = None;
    let mut json = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--cuisine" => {
                let value = iter.next().ok_or_else(|| anyhow!("--cuisine needs a value"))?;
                cuisine = Some(Filter::parse(value));
            }
            "--neighborhood" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--neighborhood needs a value"))?;
                neighborhood = Some(Filter::parse(value));
            }
            "--favorites" => favorites_only = Some(true),
            "--all" => favorites_only = Some(false),
            "--json" => json = true,
            other => bail!("Unknown list option: {}", other),
        }
    }

    Ok(Command::List {
        cuisine,
        neighborhood,
        favorites_only,
        json,
    })
}

fn take_id(args: &[String]) -> Result<(i64, &[String])> {
    let (raw, rest) = args
        .split_first()
        .ok_or_else(|| anyhow!("Missing restaurant id"))?;
    let id = raw
        .parse()
        .map_err(|_| anyhow!("Invalid restaurant id: {}", raw))?;
    Ok((id, rest))
}

fn no_args(command: Command, rest: &[String]) -> Result<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        bail!("Unexpected arguments: {}", rest.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Result<Invocation> {
        let args: Vec<String> = line.split_whitespace().map(String::from).collect();
        Invocation::parse(&args)
    }

    #[test]
    fn test_defaults_to_list() {
        let inv = parse("").unwrap();
        assert!(!inv.offline);
        assert_eq!(
            inv.command,
            Command::List {
                cuisine: None,
                neighborhood: None,
                favorites_only: None,
                json: false
            }
        );
    }

    #[test]
    fn test_list_filters() {
        let inv = parse("--offline list --cuisine Asian --neighborhood all --favorites").unwrap();
        assert!(inv.offline);
        assert_eq!(
            inv.command,
            Command::List {
                cuisine: Some(Filter::Only("Asian".to_string())),
                neighborhood: Some(Filter::All),
                favorites_only: Some(true),
                json: false
            }
        );
        assert!(parse("list --cuisine").is_err());
        assert!(parse("list --bogus").is_err());
    }

    #[test]
    fn test_review_joins_comments() {
        let inv = parse("review 3 Ann 4 Great dumplings here").unwrap();
        assert_eq!(
            inv.command,
            Command::Review {
                id: 3,
                name: "Ann".to_string(),
                rating: "4".to_string(),
                comments: "Great dumplings here".to_string(),
            }
        );
        assert!(parse("review 3 Ann 4").is_err());
    }

    #[test]
    fn test_ids_must_be_numeric() {
        assert!(parse("show abc").is_err());
        assert!(parse("favorite").is_err());
        assert_eq!(parse("show 7 --json").unwrap().command, Command::Show { id: 7, json: true });
    }

    #[test]
    fn test_usage_describes_offline_flag() {
        let line = USAGE
            .lines()
            .find(|line| line.trim_start().starts_with("--offline"))
            .unwrap();
        assert!(line.contains("Queue new reviews locally"));
        assert!(!USAGE.contains("local database only"));
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse("frobnicate").is_err());
        assert!(parse("sync now").is_err());
        assert_eq!(parse("--help").unwrap().command, Command::Help);
    }
}
