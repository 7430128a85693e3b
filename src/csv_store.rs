//! CSV data directory backing a [`MemoryStore`].
//!
//! One file per table, each with a header row. Missing files load as empty
//! tables. Malformed rows, duplicate ids and values outside the record bounds
//! abort the load; rows pointing at unknown games or users are logged at warn
//! level and skipped.
//!
//! [`save_dir`] rewrites every table from the in-memory snapshot, not just the
//! table that changed. Each file is replaced atomically, so a reader never sees
//! a half-written table. There is no locking or merging: when two processes
//! load the directory, change it and save, the later save replaces all six
//! tables with its own stale snapshot. Rows the earlier process added to any
//! table, for any user, are lost.

use crate::error::{LedgerError, Result};
use crate::model::{
    check_rebuy_total, parse_label, parse_order, parse_rebuy, parse_result, ChipResult, GameId,
    GameRow, Order, ParticipantRow, Rebuy, User, UserId,
};
use crate::store::MemoryStore;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

pub const USERS_FILE: &str = "users.csv";
pub const GAMES_FILE: &str = "games.csv";
pub const PARTICIPANTS_FILE: &str = "participants.csv";
pub const ORDERS_FILE: &str = "orders.csv";
pub const REBUYS_FILE: &str = "rebuys.csv";
pub const RESULTS_FILE: &str = "results.csv";

const USER_HEADERS: [&str; 2] = ["id", "username"];
const GAME_HEADERS: [&str; 8] = [
    "id",
    "name",
    "date",
    "table_fee",
    "initial_chips",
    "chip_rate",
    "rebuy_chips",
    "created_by",
];
const PARTICIPANT_HEADERS: [&str; 2] = ["game", "user"];
const ORDER_HEADERS: [&str; 5] = ["id", "game", "user", "name", "price"];
const REBUY_HEADERS: [&str; 4] = ["id", "game", "user", "count"];
const RESULT_HEADERS: [&str; 3] = ["game", "user", "final_chips"];

/// Loads every table found in `dir`.
pub fn load_dir(dir: &Path) -> Result<MemoryStore> {
    let mut store = MemoryStore::new();

    for (row, user) in read_table::<User>(dir, USERS_FILE)? {
        let username =
            parse_label("username", &user.username).map_err(|m| invalid(USERS_FILE, row, m))?;
        if store.users.iter().any(|u| u.id == user.id || u.username == username) {
            return Err(invalid(USERS_FILE, row, format!("duplicate user {}", username)));
        }
        store.users.push(User {
            id: user.id,
            username,
        });
    }

    for (row, game_row) in read_table::<GameRow>(dir, GAMES_FILE)? {
        let game = game_row.parse().map_err(|m| invalid(GAMES_FILE, row, m))?;
        if store.games.iter().any(|g| g.id == game.id) {
            return Err(invalid(GAMES_FILE, row, format!("duplicate game id {}", game.id)));
        }
        store.games.push(game);
    }

    for (row, participant) in read_table::<ParticipantRow>(dir, PARTICIPANTS_FILE)? {
        if !references_exist(&store, PARTICIPANTS_FILE, row, participant.game, participant.user) {
            continue;
        }
        if !store.participants.contains(&participant) {
            store.participants.push(participant);
        }
    }

    for (row, order) in read_table::<Order>(dir, ORDERS_FILE)? {
        if !references_exist(&store, ORDERS_FILE, row, order.game, order.user) {
            continue;
        }
        let order = parse_order(order).map_err(|m| invalid(ORDERS_FILE, row, m))?;
        if store.orders.iter().any(|o| o.id == order.id) {
            return Err(invalid(ORDERS_FILE, row, format!("duplicate order id {}", order.id)));
        }
        store.orders.push(order);
    }

    for (row, rebuy) in read_table::<Rebuy>(dir, REBUYS_FILE)? {
        if !references_exist(&store, REBUYS_FILE, row, rebuy.game, rebuy.user) {
            continue;
        }
        let rebuy = parse_rebuy(rebuy).map_err(|m| invalid(REBUYS_FILE, row, m))?;
        if store.rebuys.iter().any(|r| r.id == rebuy.id) {
            return Err(invalid(REBUYS_FILE, row, format!("duplicate rebuy id {}", rebuy.id)));
        }
        check_rebuy_total(&store.rebuys, &rebuy).map_err(|m| invalid(REBUYS_FILE, row, m))?;
        store.rebuys.push(rebuy);
    }

    for (row, result) in read_table::<ChipResult>(dir, RESULTS_FILE)? {
        if !references_exist(&store, RESULTS_FILE, row, result.game, result.user) {
            continue;
        }
        let result = parse_result(result).map_err(|m| invalid(RESULTS_FILE, row, m))?;
        match store
            .results
            .iter_mut()
            .find(|r| r.game == result.game && r.user == result.user)
        {
            Some(existing) => {
                warn!(
                    "{} row {}: second result for game {} user {}, keeping the later one",
                    RESULTS_FILE, row, result.game, result.user
                );
                existing.final_chips = result.final_chips;
            }
            None => store.results.push(result),
        }
    }

    debug!(
        "Loaded {} users, {} games, {} orders, {} rebuys, {} results from {}",
        store.users.len(),
        store.games.len(),
        store.orders.len(),
        store.rebuys.len(),
        store.results.len(),
        dir.display()
    );

    Ok(store)
}

/// Writes every table of `store` into `dir`, creating the directory if needed.
///
/// All six files are rewritten even when only one table changed.
pub fn save_dir(store: &MemoryStore, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    write_table(dir, USERS_FILE, &USER_HEADERS, &store.users)?;
    write_table(
        dir,
        GAMES_FILE,
        &GAME_HEADERS,
        store.games.iter().map(GameRow::from),
    )?;
    write_table(dir, PARTICIPANTS_FILE, &PARTICIPANT_HEADERS, &store.participants)?;
    write_table(dir, ORDERS_FILE, &ORDER_HEADERS, &store.orders)?;
    write_table(dir, REBUYS_FILE, &REBUY_HEADERS, &store.rebuys)?;
    write_table(dir, RESULTS_FILE, &RESULT_HEADERS, &store.results)?;

    info!("Saved ledger to {}", dir.display());
    Ok(())
}

/// Reads `file` from `dir`, pairing each record with its 1-indexed row number.
fn read_table<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Vec<(usize, T)>> {
    let path = dir.join(file);
    if !path.exists() {
        debug!("{} not found, starting with an empty table", path.display());
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_path(&path)?;
    let mut records = Vec::new();

    for (row_idx, result) in reader.deserialize::<T>().enumerate() {
        let row_num = row_idx + 2; // 1-indexed, accounting for header row
        let record = result.map_err(|e| invalid(file, row_num, e.to_string()))?;
        records.push((row_num, record));
    }

    Ok(records)
}

fn write_table<T, I>(dir: &Path, file: &str, headers: &[&str], rows: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        // Headers are written by hand so empty tables still get them.
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer.write_record(headers)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }

    tmp.persist(dir.join(file))
        .map_err(|e| LedgerError::Io(e.error))?;
    Ok(())
}

fn references_exist(
    store: &MemoryStore,
    file: &str,
    row: usize,
    game: GameId,
    user: UserId,
) -> bool {
    if !store.games.iter().any(|g| g.id == game) {
        warn!("{} row {}: unknown game {}, skipping", file, row, game);
        return false;
    }
    if store.user(user).is_err() {
        warn!("{} row {}: unknown user {}, skipping", file, row, user);
        return false;
    }
    true
}

fn invalid(file: &str, row: usize, message: impl Into<String>) -> LedgerError {
    LedgerError::InvalidRecord {
        file: file.to_string(),
        row,
        message: message.into(),
    }
}
