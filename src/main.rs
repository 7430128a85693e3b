//! Poker Ledger CLI
//!
//! Records orders, rebuys and final chip counts for home poker games kept in
//! a directory of CSV files, and prints each game's settlement.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --data-dir ledger result 1 alice 1800
//! cargo run -- --data-dir ledger settle 1 > settlement.csv
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity
//! - `POKER_LEDGER_DATA_DIR`: Data directory used when `--data-dir` is absent

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use poker_ledger::store::Upsert;
use poker_ledger::summary::{self, write_breakdown, write_menu};
use poker_ledger::{
    settle, Game, GameId, GameUpdate, MemoryStore, Money, NewGame, Result, Store, StoreConfig,
    UserId,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(name = "poker-ledger", version, about = "Home poker game ledger and settlement")]
struct Cli {
    /// Directory holding the ledger CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a user
    AddUser { username: String },

    /// Create a game
    CreateGame {
        name: String,
        #[arg(long)]
        created_by: String,
        #[arg(long)]
        table_fee: i64,
        #[arg(long)]
        initial_chips: i64,
        #[arg(long)]
        chip_rate: Money,
        #[arg(long)]
        rebuy_chips: i64,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "participant")]
        participants: Vec<String>,
    },

    /// Edit a game's name or parameters
    EditGame {
        game: GameId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        table_fee: Option<i64>,
        #[arg(long)]
        initial_chips: Option<i64>,
        #[arg(long)]
        chip_rate: Option<Money>,
        #[arg(long)]
        rebuy_chips: Option<i64>,
    },

    /// Add a participant to a game
    Join { game: GameId, user: String },

    /// List games, newest first
    Games,

    /// Record a food or drink order
    Order {
        game: GameId,
        user: String,
        name: String,
        #[arg(allow_negative_numbers = true)]
        price: i64,
    },

    /// Record a rebuy of 1 to 3 units
    Rebuy {
        game: GameId,
        user: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..=3))]
        count: u32,
    },

    /// Register or update a player's final chip count
    #[command(name = "result")]
    FinalChips {
        game: GameId,
        user: String,
        #[arg(allow_negative_numbers = true)]
        final_chips: i64,
    },

    /// Show a player's orders, rebuys and registered chips
    Status { game: GameId, user: String },

    /// List previously ordered items at their highest price
    Menu,

    /// Per-item order totals of a game
    Items { game: GameId },

    /// Print a game's settlement
    Settle {
        game: GameId,
        /// Emit JSON instead of CSV
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = StoreConfig::from_cli_or_env(cli.data_dir);
    let mut store = config.open()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::AddUser { username } => {
            let user = store.add_user(&username)?;
            config.save(&store)?;
            writeln!(out, "User {} registered with id {}", user.username, user.id)?;
        }
        Command::CreateGame {
            name,
            created_by,
            table_fee,
            initial_chips,
            chip_rate,
            rebuy_chips,
            date,
            participants,
        } => {
            let creator = store.find_user(&created_by)?;
            let game = store.create_game(NewGame {
                name,
                date: date.unwrap_or_else(|| Local::now().date_naive()),
                table_fee,
                initial_chips,
                chip_rate,
                rebuy_chips,
                created_by: creator.id,
            })?;
            for username in &participants {
                let user = store.find_user(username)?;
                store.add_participant(game.id, user.id)?;
            }
            config.save(&store)?;
            writeln!(out, "Game {} created", game.id)?;
        }
        Command::EditGame {
            game,
            name,
            table_fee,
            initial_chips,
            chip_rate,
            rebuy_chips,
        } => {
            let update = GameUpdate {
                name,
                table_fee,
                initial_chips,
                chip_rate,
                rebuy_chips,
            };
            let game = store.update_game(game, &update)?;
            config.save(&store)?;
            writeln!(out, "Game {} updated", game.id)?;
        }
        Command::Join { game, user } => {
            let user = store.find_user(&user)?;
            store.add_participant(game, user.id)?;
            config.save(&store)?;
            writeln!(out, "{} joined game {}", user.username, game)?;
        }
        Command::Games => write_games(&store.list_games(), &mut out)?,
        Command::Order {
            game,
            user,
            name,
            price,
        } => {
            let user = store.find_user(&user)?;
            store.create_order(game, user.id, &name, price)?;
            config.save(&store)?;
            writeln!(out, "Order registered")?;
        }
        Command::Rebuy { game, user, count } => {
            let user = store.find_user(&user)?;
            store.create_rebuy(game, user.id, count)?;
            config.save(&store)?;
            writeln!(out, "Rebuy registered")?;
        }
        Command::FinalChips {
            game,
            user,
            final_chips,
        } => {
            let user = store.find_user(&user)?;
            let outcome = store.upsert_result(game, user.id, final_chips)?;
            config.save(&store)?;
            match outcome {
                Upsert::Created => writeln!(out, "Final chips registered")?,
                Upsert::Updated => writeln!(out, "Final chips updated")?,
            }
        }
        Command::Status { game, user } => {
            let user = store.find_user(&user)?;
            write_status(&store, game, user.id, &mut out)?;
        }
        Command::Menu => write_menu(&summary::order_menu(&store.list_all_orders()), &mut out)?,
        Command::Items { game } => {
            let orders = store.list_orders(game)?;
            write_breakdown(&summary::order_breakdown(game, &orders), &mut out)?;
        }
        Command::Settle { game, json } => {
            let report = settle(&store, game)?;
            if json {
                serde_json::to_writer_pretty(&mut out, &report)?;
                writeln!(out)?;
            } else {
                report.write_csv(&mut out)?;
            }
        }
    }

    Ok(())
}

fn write_games<W: Write>(games: &[Game], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "id",
        "date",
        "name",
        "table_fee",
        "initial_chips",
        "chip_rate",
        "rebuy_chips",
    ])?;
    for game in games {
        csv_writer.write_record([
            game.id.to_string(),
            game.date.to_string(),
            game.name.clone(),
            game.table_fee.to_string(),
            game.initial_chips.to_string(),
            game.chip_rate.as_decimal().to_string(),
            game.rebuy_chips.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_status<W: Write>(
    store: &MemoryStore,
    game: GameId,
    user: UserId,
    writer: W,
) -> Result<()> {
    let status = summary::player_status(
        game,
        user,
        &store.list_orders_for(game, user)?,
        &store.list_rebuys(game)?,
        &store.list_results(game)?,
    );

    let mut csv_writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(writer);
    csv_writer.write_record(["order", "name", "price"])?;
    for order in &status.orders {
        csv_writer.write_record([
            order.id.to_string(),
            order.name.clone(),
            order.price.to_string(),
        ])?;
    }
    csv_writer.write_record(["order_total", "rebuy_count", "final_chips"])?;
    csv_writer.write_record([
        status.order_total.to_string(),
        status.rebuy_count.to_string(),
        status
            .final_chips
            .map_or_else(String::new, |chips| chips.to_string()),
    ])?;
    csv_writer.flush()?;
    Ok(())
}
