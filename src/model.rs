//! Ledger records and the CSV row shapes used to persist them.
//!
//! Each table has a raw `*Row` type that mirrors the CSV columns and a typed
//! record produced by `parse`, which enforces the record's invariants.

use crate::money::Money;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Game identifier.
pub type GameId = u32;

/// User identifier.
pub type UserId = u32;

/// Smallest chip count, fee or price a record may hold.
pub const MIN_AMOUNT: i64 = i32::MIN as i64;

/// Largest chip count, fee, price or per-player rebuy total a record may hold.
pub const MAX_AMOUNT: i64 = i32::MAX as i64;

// Chip rates: at most 10 digits, 2 of them after the decimal point.
const CHIP_RATE_DIGITS: u32 = 10;
const CHIP_RATE_PLACES: u32 = 2;

/// A registered player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// One poker session and the parameters its settlement is computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub date: NaiveDate,

    /// Total cover charge for the session, split evenly between participants.
    pub table_fee: i64,

    /// Chips every participant starts with.
    pub initial_chips: i64,

    /// Money per chip.
    pub chip_rate: Money,

    /// Chips granted per rebuy unit.
    pub rebuy_chips: i64,

    pub created_by: UserId,
}

impl Game {
    /// Checks the parameter invariants shared by create, edit and load.
    pub fn validate(&self) -> Result<(), String> {
        if self.table_fee < 0 {
            return Err(format!("table fee {} is negative", self.table_fee));
        }
        check_amount("table fee", self.table_fee)?;
        check_amount("initial chips", self.initial_chips)?;
        check_amount("rebuy chips", self.rebuy_chips)?;

        if self.chip_rate.is_negative() {
            return Err(format!("chip rate {} is negative", self.chip_rate));
        }
        let rate = self.chip_rate.as_decimal();
        let exact = rate.normalize();
        let limit = Decimal::from(10_i64.pow(CHIP_RATE_DIGITS - CHIP_RATE_PLACES));
        if exact.scale() > CHIP_RATE_PLACES || exact >= limit {
            return Err(format!(
                "chip rate {} does not fit {} digits with {} decimal places",
                rate, CHIP_RATE_DIGITS, CHIP_RATE_PLACES
            ));
        }
        Ok(())
    }
}

/// Parameters for a new game; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewGame {
    pub name: String,
    pub date: NaiveDate,
    pub table_fee: i64,
    pub initial_chips: i64,
    pub chip_rate: Money,
    pub rebuy_chips: i64,
    pub created_by: UserId,
}

/// Partial edit of a game's name and numeric parameters.
#[derive(Debug, Clone, Default)]
pub struct GameUpdate {
    pub name: Option<String>,
    pub table_fee: Option<i64>,
    pub initial_chips: Option<i64>,
    pub chip_rate: Option<Money>,
    pub rebuy_chips: Option<i64>,
}

impl GameUpdate {
    /// Applies the present fields to `game`.
    pub fn apply(&self, game: &mut Game) {
        if let Some(name) = &self.name {
            game.name = name.clone();
        }
        if let Some(table_fee) = self.table_fee {
            game.table_fee = table_fee;
        }
        if let Some(initial_chips) = self.initial_chips {
            game.initial_chips = initial_chips;
        }
        if let Some(chip_rate) = self.chip_rate {
            game.chip_rate = chip_rate;
        }
        if let Some(rebuy_chips) = self.rebuy_chips {
            game.rebuy_chips = rebuy_chips;
        }
    }
}

/// A food or drink order charged to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: u32,
    pub game: GameId,
    pub user: UserId,
    pub name: String,
    pub price: i64,
}

/// A rebuy purchase of `count` units of the game's rebuy chips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebuy {
    pub id: u32,
    pub game: GameId,
    pub user: UserId,
    pub count: u32,
}

/// A participant's registered chip count at the end of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChipResult {
    pub game: GameId,
    pub user: UserId,
    pub final_chips: i64,
}

/// Raw `games.csv` row.
///
/// The chip rate is kept as an exact decimal string so saving never rounds it.
#[derive(Debug, Serialize, Deserialize)]
pub struct GameRow {
    pub id: GameId,
    pub name: String,
    pub date: NaiveDate,
    pub table_fee: i64,
    pub initial_chips: i64,
    #[serde(with = "rust_decimal::serde::str")]
    pub chip_rate: Decimal,
    pub rebuy_chips: i64,
    pub created_by: UserId,
}

impl GameRow {
    /// Converts the row into a validated [`Game`].
    pub fn parse(self) -> Result<Game, String> {
        let game = Game {
            id: self.id,
            name: self.name.trim().to_string(),
            date: self.date,
            table_fee: self.table_fee,
            initial_chips: self.initial_chips,
            chip_rate: Money::new(self.chip_rate),
            rebuy_chips: self.rebuy_chips,
            created_by: self.created_by,
        };
        game.validate()?;
        Ok(game)
    }
}

impl From<&Game> for GameRow {
    fn from(game: &Game) -> Self {
        GameRow {
            id: game.id,
            name: game.name.clone(),
            date: game.date,
            table_fee: game.table_fee,
            initial_chips: game.initial_chips,
            chip_rate: game.chip_rate.as_decimal(),
            rebuy_chips: game.rebuy_chips,
            created_by: game.created_by,
        }
    }
}

/// Raw `participants.csv` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantRow {
    pub game: GameId,
    pub user: UserId,
}

/// Rejects empty usernames and item names.
pub fn parse_label(kind: &str, raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{} must not be empty", kind));
    }
    Ok(trimmed.to_string())
}

/// Rejects `value` unless it lies in `MIN_AMOUNT..=MAX_AMOUNT`.
pub fn check_amount(field: &str, value: i64) -> Result<i64, String> {
    if (MIN_AMOUNT..=MAX_AMOUNT).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} {} is outside {}..={}",
            field, value, MIN_AMOUNT, MAX_AMOUNT
        ))
    }
}

/// Trims the item name and range-checks the price.
pub fn parse_order(order: Order) -> Result<Order, String> {
    let name = parse_label("item name", &order.name)?;
    check_amount("price", order.price)?;
    Ok(Order { name, ..order })
}

/// Rejects rebuys of zero units or of more units than `MAX_AMOUNT`.
pub fn parse_rebuy(rebuy: Rebuy) -> Result<Rebuy, String> {
    if rebuy.count == 0 || i64::from(rebuy.count) > MAX_AMOUNT {
        return Err(format!(
            "rebuy count {} must be between 1 and {}",
            rebuy.count, MAX_AMOUNT
        ));
    }
    Ok(rebuy)
}

/// Rejects `rebuy` when it would take its player's total rebuy units for the
/// game past `MAX_AMOUNT`. `existing` may hold rows of any game.
pub fn check_rebuy_total(existing: &[Rebuy], rebuy: &Rebuy) -> Result<(), String> {
    let total: i64 = existing
        .iter()
        .filter(|r| r.game == rebuy.game && r.user == rebuy.user)
        .map(|r| i64::from(r.count))
        .sum::<i64>()
        + i64::from(rebuy.count);
    if total > MAX_AMOUNT {
        return Err(format!(
            "user {} would hold {} rebuy units in game {}, more than {}",
            rebuy.user, total, rebuy.game, MAX_AMOUNT
        ));
    }
    Ok(())
}

/// Range-checks the final chip count.
pub fn parse_result(result: ChipResult) -> Result<ChipResult, String> {
    check_amount("final chips", result.final_chips)?;
    Ok(result)
}
