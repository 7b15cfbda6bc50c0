// cobra-link CLI
// Thin operational front over the library: register owners, save bank
// details, inspect the public profile. The database lives wherever
// COBRA_LINK_DB points (default: ./cobra-link.db).

use anyhow::{bail, Context, Result};
use rusqlite::Connection;
use std::env;

use cobra_link::{
    delete_detail, find_owner_by_contact, find_owner_by_slug, get_detail, get_events_for_entity,
    insert_owner, list_details, list_public, save_detail, setup_database, DetailKind, Owner,
    SaveError, SaveRequest,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };

    let conn = open_database()?;

    match command.as_str() {
        "signup" => run_signup(&conn, &args[2..]),
        "save" => run_save(&conn, &args[2..]),
        "list" => run_list(&conn, &args[2..]),
        "profile" => run_profile(&conn, &args[2..]),
        "remove" => run_remove(&conn, &args[2..]),
        "history" => run_history(&conn, &args[2..]),
        other => {
            print_usage();
            bail!("unknown command: {other}");
        }
    }
}

fn open_database() -> Result<Connection> {
    let path = env::var("COBRA_LINK_DB").unwrap_or_else(|_| "cobra-link.db".to_string());
    let conn = Connection::open(&path).with_context(|| format!("failed to open {path}"))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn print_usage() {
    println!("cobra-link {}", cobra_link::VERSION);
    println!();
    println!("Usage:");
    println!("  cobra-link signup <email|-> <phone|-> [display name...]");
    println!("  cobra-link save <contact> <kind> <value> [--bank-name NAME] [--alias LABEL] [--private]");
    println!("  cobra-link list <contact>");
    println!("  cobra-link profile <slug>");
    println!("  cobra-link remove <contact> <kind>");
    println!("  cobra-link history <contact> <kind>");
    println!();
    println!("Kinds: CLABE, CARD, ACCOUNT. Contact is the email or phone used at signup.");
}

// ============================================================================
// COMMANDS
// ============================================================================

fn run_signup(conn: &Connection, args: &[String]) -> Result<()> {
    let (email, phone) = match args {
        [email, phone, ..] => (dash_to_empty(email), dash_to_empty(phone)),
        _ => bail!("usage: cobra-link signup <email|-> <phone|-> [display name...]"),
    };
    let display_name = args[2..].join(" ");

    let mut owner = Owner::new(email, phone, &display_name)?;
    insert_owner(conn, &mut owner)?;

    println!("✓ Owner registered: {}", owner.contact());
    println!("✓ Public profile: {}", owner.public_path());
    Ok(())
}

fn run_save(conn: &Connection, args: &[String]) -> Result<()> {
    let [contact, kind, value, rest @ ..] = args else {
        bail!("usage: cobra-link save <contact> <kind> <value> [--bank-name NAME] [--alias LABEL] [--private]");
    };

    let owner = require_owner(conn, contact)?;

    let mut req = SaveRequest {
        owner_id: owner.id.clone(),
        kind: kind.clone(),
        value: value.clone(),
        ..SaveRequest::default()
    };

    let mut rest = rest.iter();
    while let Some(flag) = rest.next() {
        match flag.as_str() {
            "--bank-name" => {
                req.bank_name = Some(rest.next().cloned().unwrap_or_default());
            }
            "--alias" => {
                req.alias = Some(rest.next().cloned().unwrap_or_default());
            }
            "--private" => req.is_public = Some(false),
            "--public" => req.is_public = Some(true),
            other => bail!("unknown option: {other}"),
        }
    }

    match save_detail(conn, &req) {
        Ok(detail) => {
            print!("✓ {} saved → {}", detail.kind, detail.masked_value());
            if !detail.bank_name.is_empty() {
                print!(" ({})", detail.bank_name);
            } else if !detail.brand.as_str().is_empty() {
                print!(" ({})", detail.brand.as_str());
            }
            println!();
            Ok(())
        }
        Err(SaveError::Invalid(err)) => {
            eprintln!("❌ {}: {}", err.field(), err);
            bail!("validation failed");
        }
        Err(SaveError::Conflict) => {
            eprintln!("❌ Another save for this detail landed first; try again.");
            bail!("write conflict");
        }
        Err(err) => Err(err.into()),
    }
}

fn run_list(conn: &Connection, args: &[String]) -> Result<()> {
    let [contact] = args else {
        bail!("usage: cobra-link list <contact>");
    };
    let owner = require_owner(conn, contact)?;

    println!("Details for {}:", owner.contact());
    let details = list_details(conn, &owner.id)?;
    if details.is_empty() {
        println!("  (none yet)");
    }
    for detail in details {
        let visibility = if detail.is_public { "public" } else { "private" };
        println!(
            "  {:<8} {}  [{}]  {}",
            detail.kind.as_str(),
            detail.masked_value(),
            visibility,
            detail.label(),
        );
    }
    Ok(())
}

fn run_profile(conn: &Connection, args: &[String]) -> Result<()> {
    let [slug] = args else {
        bail!("usage: cobra-link profile <slug>");
    };

    let Some(owner) = find_owner_by_slug(conn, slug)? else {
        eprintln!("❌ No public profile at /{slug}/");
        bail!("profile not found");
    };

    let name = if owner.display_name.is_empty() {
        owner.public_slug.clone()
    } else {
        owner.display_name.clone()
    };
    println!("{} accepts:", name);

    let details = list_public(conn, &owner.id)?;
    if details.is_empty() {
        println!("  (no public payment methods)");
    }
    for detail in details {
        let extra = if !detail.bank_name.is_empty() {
            format!(" · {}", detail.bank_name)
        } else if !detail.brand.as_str().is_empty() {
            format!(" · {}", detail.brand.as_str())
        } else {
            String::new()
        };
        println!(
            "  {:<8} {}{}",
            detail.kind.as_str(),
            detail.masked_value(),
            extra
        );
    }
    Ok(())
}

fn run_remove(conn: &Connection, args: &[String]) -> Result<()> {
    let [contact, kind] = args else {
        bail!("usage: cobra-link remove <contact> <kind>");
    };
    let owner = require_owner(conn, contact)?;
    let kind: DetailKind = kind.parse()?;

    if delete_detail(conn, &owner.id, kind)? {
        println!("✓ {} removed", kind);
    } else {
        println!("Nothing to remove for {}", kind);
    }
    Ok(())
}

fn run_history(conn: &Connection, args: &[String]) -> Result<()> {
    let [contact, kind] = args else {
        bail!("usage: cobra-link history <contact> <kind>");
    };
    let owner = require_owner(conn, contact)?;
    let kind: DetailKind = kind.parse()?;

    let Some(detail) = get_detail(conn, &owner.id, kind)? else {
        println!("No {} detail stored", kind);
        return Ok(());
    };

    let events = get_events_for_entity(conn, "bank_detail", &detail.id)?;
    println!("History for {} {}:", kind, detail.masked_value());
    for event in events {
        println!(
            "  {}  {}  by {}",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.actor
        );
    }
    Ok(())
}

// ============================================================================
// HELPERS
// ============================================================================

fn require_owner(conn: &Connection, contact: &str) -> Result<Owner> {
    match find_owner_by_contact(conn, contact)? {
        Some(owner) => Ok(owner),
        None => {
            eprintln!("❌ No owner registered with contact {contact}");
            bail!("owner not found");
        }
    }
}

fn dash_to_empty(s: &str) -> &str {
    if s == "-" {
        ""
    } else {
        s
    }
}
