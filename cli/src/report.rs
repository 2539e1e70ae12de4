//! Terminal output for ledger state

use chrono::DateTime;
use owo_colors::OwoColorize;

use stars_core::{LedgerEvent, LedgerEventKind, LedgerSnapshot, Lockup, SupplyStats, STAR_UNIT};

/// Render base units as stars with 8 decimals
pub fn format_stars(amount: u64) -> String {
    format!("{}.{:08}", amount / STAR_UNIT, amount % STAR_UNIT)
}

fn format_timestamp(timestamp: u64) -> String {
    DateTime::from_timestamp(timestamp as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn print_header(title: &str) {
    println!("\n{}", title.cyan().bold());
    println!("{}", "═══════════════════════════════════".bright_black());
}

pub fn print_supply(supply: &SupplyStats) {
    print_header("Supply");
    println!("Liquid:    {}", format_stars(supply.liquid).green());
    println!("Locked:    {}", format_stars(supply.locked).yellow());
    println!("Minted:    {}", format_stars(supply.minted));
    println!("Refunded:  {}", format_stars(supply.refunded));

    if supply.is_conserved() {
        println!("{}", "✓ Supply conserved".green());
    } else {
        println!("{}", "✗ Supply mismatch".red().bold());
    }
}

pub fn print_lockups(lockups: &[Lockup], now: u64) {
    for lockup in lockups {
        let status = if lockup.matures_at <= now {
            "matured".green().to_string()
        } else {
            "locked".yellow().to_string()
        };
        println!(
            "    {} until {} [{}]",
            format_stars(lockup.amount),
            format_timestamp(lockup.matures_at),
            status
        );
    }
}

/// Accounts table from a snapshot, optionally filtered to one account
pub fn print_accounts(
    snapshot: &LedgerSnapshot,
    filter: Option<&str>,
    blocked: &dyn Fn(&str) -> bool,
) {
    print_header("Accounts");
    let now = snapshot.taken_at.timestamp().max(0) as u64;

    let mut shown = 0;
    for (id, entry) in &snapshot.accounts {
        if filter.is_some_and(|f| f != id.as_str()) {
            continue;
        }
        shown += 1;

        let marker = if blocked(id.as_str()) {
            " [blocked]".red().to_string()
        } else {
            String::new()
        };
        let income = if snapshot.income_account.as_deref() == Some(id.as_str()) {
            " [income]".blue().to_string()
        } else {
            String::new()
        };

        println!("{}{}{}", id.bold(), income, marker);
        println!(
            "  liquid {}  locked {}  ({} buckets)",
            format_stars(entry.liquid).green(),
            format_stars(entry.locked()).yellow(),
            entry.lockups.len()
        );
        let lockups: Vec<Lockup> = entry.lockups.iter().copied().collect();
        print_lockups(&lockups, now);
    }

    if shown == 0 {
        println!("{}", "No matching accounts".bright_black());
    }
}

pub fn print_events(events: &[LedgerEvent]) {
    print_header("Events");
    for event in events {
        println!(
            "[{}] {:<22} {}",
            format_timestamp(event.timestamp),
            event.kind.label().bright_blue(),
            describe(&event.kind)
        );
    }
}

fn describe(kind: &LedgerEventKind) -> String {
    match kind {
        LedgerEventKind::Minted {
            account,
            amount,
            matures_at,
        } => format!(
            "{} to {} until {}",
            format_stars(*amount),
            account,
            format_timestamp(*matures_at)
        ),
        LedgerEventKind::Unlocked { account, amount } => {
            format!("{} for {}", format_stars(*amount), account)
        }
        LedgerEventKind::Spent {
            operator,
            account,
            amount,
            ..
        } => format!("{} from {} by {}", format_stars(*amount), account, operator),
        LedgerEventKind::Distributed {
            parent,
            grandparent,
            income_account,
            shares,
            ..
        } => format!(
            "operator {}, parent {} ({}), grandparent {} ({}), {} {}",
            format_stars(shares.operator),
            format_stars(shares.parent),
            parent.as_deref().unwrap_or("-"),
            format_stars(shares.grandparent),
            grandparent.as_deref().unwrap_or("-"),
            income_account,
            format_stars(shares.income)
        ),
        LedgerEventKind::Refunded {
            account,
            amount,
            matures_at,
        } => format!(
            "{} from {} bucket {}",
            format_stars(*amount),
            account,
            format_timestamp(*matures_at)
        ),
        LedgerEventKind::Blocked { account } => account.clone(),
        LedgerEventKind::Approved {
            owner,
            operator,
            amount,
        } => format!("{} -> {} {}", owner, operator, format_stars(*amount)),
        LedgerEventKind::Transferred { from, to, amount } => {
            format!("{} -> {} {}", from, to, format_stars(*amount))
        }
        LedgerEventKind::IncomeAccountChanged { account } => account.clone(),
    }
}
