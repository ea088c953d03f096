//! Command-line front end: list the catalog or search one category.
//!
//! Usage:
//!   digikey-scraper [groups]
//!   digikey-scraper search <group/category> [quantity]

use anyhow::{Context, Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use digikey_scraper::fetch::HttpFetcher;
use digikey_scraper::locale::Locale;
use digikey_scraper::param::{self, ParamValue};
use digikey_scraper::search::{ParamValues, Searchable};
use digikey_scraper::session::Session;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let locale = Locale::default();
    let fetcher = HttpFetcher::new(&locale)?;
    let (mut session, fresh) =
        Session::load_or_new(Session::DEFAULT_CACHE_DIR, locale).context("loading snapshot")?;

    if fresh {
        info!("no snapshot for this locale, scraping the catalog structure");
        fetcher
            .bake_cookies(session.path())
            .context("baking cookies")?;
        session.init_groups(&fetcher).context("scraping groups")?;
        session
            .init_shared_params(&fetcher)
            .context("discovering shared parameters")?;
        session.save(Session::DEFAULT_CACHE_DIR)?;
    }

    match args.first().map(String::as_str) {
        None | Some("groups") => list_groups(&session),
        Some("search") => {
            let title = args
                .get(1)
                .context("usage: search <group/category> [quantity]")?;
            let quantity = args
                .get(2)
                .map(|q| q.parse::<u64>())
                .transpose()
                .context("quantity must be a whole number")?;
            search(&fetcher, &mut session, title, quantity)
        }
        Some(other) => bail!("unknown command '{other}'"),
    }
}

fn list_groups(session: &Session) -> Result<()> {
    for group in &session.groups {
        println!("{} ({})", group.title, group.size());
        for category in &group.categories {
            match category.size {
                Some(size) => println!("  {} ({size})", category.short_title),
                None => println!("  {}", category.short_title),
            }
        }
    }
    Ok(())
}

fn search(
    fetcher: &HttpFetcher,
    session: &mut Session,
    title: &str,
    quantity: Option<u64>,
) -> Result<()> {
    session
        .init_category(fetcher, title)
        .with_context(|| format!("discovering schema for '{title}'"))?;
    session.save(Session::DEFAULT_CACHE_DIR)?;

    let mut values = ParamValues::new();
    if let Some(quantity) = quantity {
        let quantity_title = session
            .shared_params()?
            .params()
            .find(|p| p.name == param::shared::QUANTITY_NAME)
            .map(|p| p.title.clone())
            .context("shared quantity parameter missing")?;
        values.insert(quantity_title, ParamValue::UInt(quantity));
    }

    let category = session
        .category(title)
        .with_context(|| format!("no category titled '{title}'"))?;
    for part in category.search(fetcher, values, true, &session.locale)? {
        let part = part?;
        println!(
            "{}\t{}\t{}",
            part.dk_part_no().unwrap_or("?"),
            part.mfg_part_no().unwrap_or("?"),
            part.description().unwrap_or("?"),
        );
    }
    Ok(())
}
