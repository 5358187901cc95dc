use super::dashboard::{RenderOptions, render_page};
use super::ui;
use crate::App;
use crate::core::dashboard::DashboardData;
use crate::core::filter::{ViewState, apply_view};
use anyhow::{Result, anyhow, bail};
use console::Term;
use std::str::FromStr;
use tracing::{debug, error};

const HELP: &str = "\
Commands:
  item <n|name>      toggle a set
  source <n|name>    toggle a website
  items all|none     select or clear every set
  sources all|none   select or clear every website
  min <price>        minimum price
  max <price>        maximum price
  reset              restore the default filters
  refresh            clear cached data and fetch again
  help               show this text
  quit               leave";

/// A set or website picked by its 1-based list position or by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Index(usize),
    Name(String),
}

impl Target {
    fn parse(words: &[&str]) -> Result<Self> {
        let text = words.join(" ");
        if text.is_empty() {
            bail!("Missing a number or name");
        }
        Ok(match text.parse::<usize>() {
            Ok(index) => Target::Index(index),
            Err(_) => Target::Name(text),
        })
    }

    fn resolve<'a>(&self, options: &'a [String]) -> Result<&'a str> {
        match self {
            Target::Index(index) => index
                .checked_sub(1)
                .and_then(|i| options.get(i))
                .map(String::as_str)
                .ok_or_else(|| anyhow!("No entry numbered {}", index)),
            Target::Name(name) => options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(name))
                .map(String::as_str)
                .ok_or_else(|| anyhow!("Unknown entry: {}", name)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    ToggleItem(Target),
    ToggleSource(Target),
    AllItems(bool),
    AllSources(bool),
    MinPrice(f64),
    MaxPrice(f64),
    Reset,
    Refresh,
    Help,
    Quit,
}

fn parse_price(words: &[&str]) -> Result<f64> {
    let [word] = words else {
        bail!("Expected a single price");
    };
    let price: f64 = word
        .parse()
        .map_err(|_| anyhow!("Invalid price: {}", word))?;
    if !price.is_finite() || price < 0.0 {
        bail!("Price must be a non-negative number: {}", word);
    }
    Ok(price)
}

fn parse_all_or_none(words: &[&str]) -> Result<bool> {
    match words {
        ["all"] => Ok(true),
        ["none"] => Ok(false),
        _ => bail!("Expected 'all' or 'none'"),
    }
}

impl FromStr for SessionCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = s.split_whitespace().collect();
        let Some((command, rest)) = words.split_first() else {
            bail!("Empty command");
        };
        match command.to_lowercase().as_str() {
            "item" => Ok(SessionCommand::ToggleItem(Target::parse(rest)?)),
            "source" => Ok(SessionCommand::ToggleSource(Target::parse(rest)?)),
            "items" => Ok(SessionCommand::AllItems(parse_all_or_none(rest)?)),
            "sources" => Ok(SessionCommand::AllSources(parse_all_or_none(rest)?)),
            "min" => Ok(SessionCommand::MinPrice(parse_price(rest)?)),
            "max" => Ok(SessionCommand::MaxPrice(parse_price(rest)?)),
            "reset" => Ok(SessionCommand::Reset),
            "refresh" => Ok(SessionCommand::Refresh),
            "help" | "?" => Ok(SessionCommand::Help),
            "quit" | "exit" | "q" => Ok(SessionCommand::Quit),
            other => Err(anyhow!("Unknown command: {}", other)),
        }
    }
}

/// What the session loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Render,
    Refresh,
    Help,
    Quit,
}

/// Applies a filter command to `view`.
///
/// `sources` are the websites offered by the current render, so numbering
/// matches what the user sees.
pub fn apply_command(
    command: &SessionCommand,
    view: &mut ViewState,
    items: &[String],
    sources: &[String],
) -> Result<Outcome> {
    match command {
        SessionCommand::ToggleItem(target) => view.toggle_item(target.resolve(items)?),
        SessionCommand::ToggleSource(target) => view.toggle_source(target.resolve(sources)?),
        SessionCommand::AllItems(true) => view.hidden_items.clear(),
        SessionCommand::AllItems(false) => view.hidden_items = items.iter().cloned().collect(),
        SessionCommand::AllSources(true) => view.hidden_sources.clear(),
        SessionCommand::AllSources(false) => {
            view.hidden_sources.extend(sources.iter().cloned())
        }
        SessionCommand::MinPrice(price) => view.min_price = Some(*price),
        SessionCommand::MaxPrice(price) => view.max_price = Some(*price),
        SessionCommand::Reset => *view = ViewState::default(),
        SessionCommand::Refresh => return Ok(Outcome::Refresh),
        SessionCommand::Help => return Ok(Outcome::Help),
        SessionCommand::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Render)
}

/// Render, read a command, apply it, render again.
pub async fn run(app: &App) -> Result<()> {
    let term = Term::stdout();
    let items = app.config.catalog_names();
    let mut view = ViewState::default();
    let mut data: DashboardData = app.load().await?;

    loop {
        let filtered = apply_view(&data.combined, &items, &view);
        term.clear_screen()?;
        println!(
            "{}",
            render_page(
                &app.config,
                &data,
                &filtered,
                &app.resolver,
                &RenderOptions::default()
            )
        );

        loop {
            print!("{} ", ui::style_text("brickprice>", ui::StyleType::Header));
            std::io::Write::flush(&mut std::io::stdout())?;
            let line = term.read_line()?;
            if line.trim().is_empty() {
                continue;
            }

            let outcome = line.parse::<SessionCommand>().and_then(|command| {
                debug!(?command, "Session command");
                apply_command(&command, &mut view, &items, &filtered.selectable_sources)
            });
            match outcome {
                Ok(Outcome::Render) => break,
                Ok(Outcome::Help) => println!("{HELP}"),
                Ok(Outcome::Quit) => return Ok(()),
                Ok(Outcome::Refresh) => {
                    app.cache.clear().await;
                    match app.load().await {
                        Ok(fresh) => data = fresh,
                        Err(e) => {
                            error!(error = %e, "Refresh failed");
                            println!("{}", ui::style_text(&format!("{e}"), ui::StyleType::Error));
                            continue;
                        }
                    }
                    break;
                }
                Err(e) => println!("{}", ui::style_text(&format!("{e}"), ui::StyleType::Error)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            "item 2".parse::<SessionCommand>().unwrap(),
            SessionCommand::ToggleItem(Target::Index(2))
        );
        assert_eq!(
            "source  shop us ".parse::<SessionCommand>().unwrap(),
            SessionCommand::ToggleSource(Target::Name("shop us".to_string()))
        );
        assert_eq!(
            "items none".parse::<SessionCommand>().unwrap(),
            SessionCommand::AllItems(false)
        );
        assert_eq!(
            "MAX 250.5".parse::<SessionCommand>().unwrap(),
            SessionCommand::MaxPrice(250.5)
        );
        assert_eq!("q".parse::<SessionCommand>().unwrap(), SessionCommand::Quit);
        assert_eq!(
            "refresh".parse::<SessionCommand>().unwrap(),
            SessionCommand::Refresh
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("min -1".parse::<SessionCommand>().is_err());
        assert!("min NaN".parse::<SessionCommand>().is_err());
        assert!("max 1 2".parse::<SessionCommand>().is_err());
        assert!("item".parse::<SessionCommand>().is_err());
        assert!("sources some".parse::<SessionCommand>().is_err());
        assert!("dance".parse::<SessionCommand>().is_err());
        assert!("".parse::<SessionCommand>().is_err());
    }

    #[test]
    fn test_apply_toggles_by_index_and_name() {
        let items = names(&["Apollo Saturn V", "Jeep Wrangler"]);
        let sources = names(&["shop-a", "shop-b"]);
        let mut view = ViewState::default();

        let outcome = apply_command(
            &SessionCommand::ToggleItem(Target::Index(2)),
            &mut view,
            &items,
            &sources,
        )
        .unwrap();
        assert_eq!(outcome, Outcome::Render);
        assert!(view.hidden_items.contains("Jeep Wrangler"));

        apply_command(
            &SessionCommand::ToggleSource(Target::Name("SHOP-A".to_string())),
            &mut view,
            &items,
            &sources,
        )
        .unwrap();
        assert!(view.hidden_sources.contains("shop-a"));

        let err = apply_command(
            &SessionCommand::ToggleItem(Target::Index(0)),
            &mut view,
            &items,
            &sources,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No entry numbered 0"));
    }

    #[test]
    fn test_apply_bulk_and_reset() {
        let items = names(&["Apollo Saturn V", "Jeep Wrangler"]);
        let sources = names(&["shop-a"]);
        let mut view = ViewState::default();

        apply_command(&SessionCommand::AllItems(false), &mut view, &items, &sources).unwrap();
        assert_eq!(view.hidden_items.len(), 2);
        apply_command(&SessionCommand::AllSources(false), &mut view, &items, &sources).unwrap();
        apply_command(&SessionCommand::MinPrice(5.0), &mut view, &items, &sources).unwrap();
        assert_eq!(view.min_price, Some(5.0));

        assert_eq!(
            apply_command(&SessionCommand::Refresh, &mut view, &items, &sources).unwrap(),
            Outcome::Refresh
        );
        apply_command(&SessionCommand::Reset, &mut view, &items, &sources).unwrap();
        assert_eq!(view, ViewState::default());
    }
}
