//! Settlement calculation.
//!
//! Converts each participant's chip result, rebuys and orders into the money
//! they owe (positive) or are owed (negative) at the end of a game.
//! [`compute_settlement`] is a pure function over already-fetched rows;
//! [`settle`] fetches those rows through a [`Store`] first.

use crate::error::Result;
use crate::model::{ChipResult, Game, GameId, Order, Rebuy, User, UserId};
use crate::money::Money;
use crate::store::Store;
use log::{debug, warn};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::io::Write;

/// Settlement of one participant who registered final chips.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerSettlement {
    pub user: String,
    pub initial_chips: i64,
    pub rebuy_count: i64,
    pub start_chips: i64,
    pub final_chips: i64,
    pub chip_diff: i64,
    pub chip_money: Money,
    #[serde(rename = "orders")]
    pub order_total: Money,
    pub table_share: Money,

    /// Positive: owes the pot. Negative: is owed by the pot.
    pub final_payment: Money,

    /// Money value of the rebuy chips. Already reflected in `chip_money`
    /// through `start_chips`, so it is reported but never charged.
    #[serde(skip)]
    pub rebuy_money: Money,
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementLine {
    /// Participant without a registered chip result.
    Unregistered { user: String },
    Settled(PlayerSettlement),
}

impl SettlementLine {
    pub fn user(&self) -> &str {
        match self {
            SettlementLine::Unregistered { user } => user,
            SettlementLine::Settled(line) => &line.user,
        }
    }

    pub fn is_unregistered(&self) -> bool {
        matches!(self, SettlementLine::Unregistered { .. })
    }

    /// Returns the financial fields, or `None` for unregistered participants.
    pub fn settled(&self) -> Option<&PlayerSettlement> {
        match self {
            SettlementLine::Settled(line) => Some(line),
            SettlementLine::Unregistered { .. } => None,
        }
    }
}

impl Serialize for SettlementLine {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            SettlementLine::Unregistered { user } => {
                let mut state = serializer.serialize_struct("SettlementLine", 2)?;
                state.serialize_field("user", user)?;
                state.serialize_field("unregistered", &true)?;
                state.end()
            }
            SettlementLine::Settled(line) => {
                #[derive(Serialize)]
                struct Flagged<'a> {
                    #[serde(flatten)]
                    line: &'a PlayerSettlement,
                    unregistered: bool,
                }

                Flagged {
                    line,
                    unregistered: false,
                }
                .serialize(serializer)
            }
        }
    }
}

/// Game-wide aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementTotals {
    /// Sum of registered participants' chip diffs. Zero in a closed chip economy.
    /// Wider than a single diff so any number of bounded participants fits.
    pub total_chip_diff: i128,
    pub is_balanced: bool,

    /// Every order of the game, whether or not its buyer registered chips.
    pub total_orders: Money,
    pub total_table_fee: Money,
    pub shop_total: Money,
}

/// Full settlement of a game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementReport {
    pub game: GameId,
    pub table_share: Money,
    pub lines: Vec<SettlementLine>,
    pub totals: SettlementTotals,
}

/// Computes the settlement of `game`.
///
/// `participants` defines who gets a line, in order. Orders, rebuys and
/// results belonging to other games are ignored. When a participant has
/// several results the first one wins.
pub fn compute_settlement(
    game: &Game,
    participants: &[User],
    orders: &[Order],
    rebuys: &[Rebuy],
    results: &[ChipResult],
) -> SettlementReport {
    let table_fee = Money::from_units(game.table_fee);
    let table_share = table_fee.split(participants.len());

    let mut lines = Vec::with_capacity(participants.len());
    let mut total_chip_diff: i128 = 0;

    for user in participants {
        let order_total = Money::from_units(order_total(game.id, user.id, orders));
        let rebuy_count = rebuy_count(game.id, user.id, rebuys);
        let rebuy_chips = rebuy_count * game.rebuy_chips;
        let rebuy_money = game.chip_rate.times(rebuy_chips);

        let result = results
            .iter()
            .find(|r| r.game == game.id && r.user == user.id);

        let Some(result) = result else {
            debug!(
                "Game {}: {} has no final chips registered",
                game.id, user.username
            );
            lines.push(SettlementLine::Unregistered {
                user: user.username.clone(),
            });
            continue;
        };

        let start_chips = game.initial_chips + rebuy_chips;
        let chip_diff = result.final_chips - start_chips;
        let chip_money = game.chip_rate.times(chip_diff);
        total_chip_diff += i128::from(chip_diff);

        let final_payment = order_total + table_share - chip_money;

        debug!(
            "Game {}: {} started with {} chips, ended with {}, pays {}",
            game.id, user.username, start_chips, result.final_chips, final_payment
        );

        lines.push(SettlementLine::Settled(PlayerSettlement {
            user: user.username.clone(),
            initial_chips: game.initial_chips,
            rebuy_count,
            start_chips,
            final_chips: result.final_chips,
            chip_diff,
            chip_money,
            order_total,
            table_share,
            final_payment,
            rebuy_money,
        }));
    }

    let total_orders: Money = orders
        .iter()
        .filter(|o| o.game == game.id)
        .map(|o| Money::from_units(o.price))
        .sum();

    let is_balanced = total_chip_diff == 0;
    if !is_balanced {
        warn!(
            "Game {}: chip totals do not balance (off by {})",
            game.id, total_chip_diff
        );
    }

    SettlementReport {
        game: game.id,
        table_share,
        lines,
        totals: SettlementTotals {
            total_chip_diff,
            is_balanced,
            total_orders,
            total_table_fee: table_fee,
            shop_total: total_orders + table_fee,
        },
    }
}

/// Loads `game_id` and its rows from `store` and settles it.
pub fn settle<S: Store + ?Sized>(store: &S, game_id: GameId) -> Result<SettlementReport> {
    let game = store.get_game(game_id)?;
    let participants = store.list_participants(game_id)?;
    let orders = store.list_orders(game_id)?;
    let rebuys = store.list_rebuys(game_id)?;
    let results = store.list_results(game_id)?;

    Ok(compute_settlement(
        &game,
        &participants,
        &orders,
        &rebuys,
        &results,
    ))
}

fn order_total(game: GameId, user: UserId, orders: &[Order]) -> i64 {
    orders
        .iter()
        .filter(|o| o.game == game && o.user == user)
        .map(|o| o.price)
        .sum()
}

fn rebuy_count(game: GameId, user: UserId, rebuys: &[Rebuy]) -> i64 {
    rebuys
        .iter()
        .filter(|r| r.game == game && r.user == user)
        .map(|r| i64::from(r.count))
        .sum()
}

impl SettlementReport {
    /// Writes the report as CSV: the participant table, then the totals table.
    ///
    /// Money is formatted with exactly two decimal places. Unregistered
    /// participants leave the numeric columns empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(writer);

        csv_writer.write_record([
            "user",
            "initial_chips",
            "rebuy_count",
            "start_chips",
            "final_chips",
            "chip_diff",
            "chip_money",
            "orders",
            "table_share",
            "final_payment",
            "unregistered",
        ])?;

        for line in &self.lines {
            match line {
                SettlementLine::Unregistered { user } => {
                    let mut record = vec![user.clone()];
                    record.extend(std::iter::repeat(String::new()).take(9));
                    record.push("true".to_string());
                    csv_writer.write_record(&record)?;
                }
                SettlementLine::Settled(s) => {
                    csv_writer.write_record([
                        s.user.clone(),
                        s.initial_chips.to_string(),
                        s.rebuy_count.to_string(),
                        s.start_chips.to_string(),
                        s.final_chips.to_string(),
                        s.chip_diff.to_string(),
                        s.chip_money.to_string(),
                        s.order_total.to_string(),
                        s.table_share.to_string(),
                        s.final_payment.to_string(),
                        "false".to_string(),
                    ])?;
                }
            }
        }

        csv_writer.write_record([
            "total_chip_diff",
            "is_balanced",
            "total_orders",
            "total_table_fee",
            "shop_total",
        ])?;
        csv_writer.write_record([
            self.totals.total_chip_diff.to_string(),
            self.totals.is_balanced.to_string(),
            self.totals.total_orders.to_string(),
            self.totals.total_table_fee.to_string(),
            self.totals.shop_total.to_string(),
        ])?;

        csv_writer.flush()?;
        Ok(())
    }
}
