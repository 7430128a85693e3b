//! Read-only views over recorded orders and rebuys.

use crate::error::Result;
use crate::model::{ChipResult, GameId, Order, Rebuy, UserId};
use crate::money::Money;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

/// An item that has been ordered before, at the highest price seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuItem {
    pub name: String,
    pub price: i64,
}

/// Quantity and amount ordered of one item in a game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemTotal {
    pub name: String,
    pub quantity: usize,
    pub amount: Money,
}

/// What a player has recorded so far in a game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStatus {
    /// Newest first.
    pub orders: Vec<Order>,
    pub order_total: Money,
    pub rebuy_count: i64,
    pub final_chips: Option<i64>,
}

/// Distinct item names across `orders`, sorted by name.
pub fn order_menu(orders: &[Order]) -> Vec<MenuItem> {
    let mut menu: BTreeMap<&str, i64> = BTreeMap::new();
    for order in orders {
        menu.entry(order.name.as_str())
            .and_modify(|price| *price = (*price).max(order.price))
            .or_insert(order.price);
    }

    menu.into_iter()
        .map(|(name, price)| MenuItem {
            name: name.to_string(),
            price,
        })
        .collect()
}

/// Per-item quantity and amount for the orders of `game`, sorted by name.
pub fn order_breakdown(game: GameId, orders: &[Order]) -> Vec<ItemTotal> {
    let mut items: BTreeMap<&str, (usize, i64)> = BTreeMap::new();
    for order in orders.iter().filter(|o| o.game == game) {
        let entry = items.entry(order.name.as_str()).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += order.price;
    }

    items
        .into_iter()
        .map(|(name, (quantity, amount))| ItemTotal {
            name: name.to_string(),
            quantity,
            amount: Money::from_units(amount),
        })
        .collect()
}

/// `user`'s own orders, rebuy units and final chips in `game`.
pub fn player_status(
    game: GameId,
    user: UserId,
    orders: &[Order],
    rebuys: &[Rebuy],
    results: &[ChipResult],
) -> PlayerStatus {
    let mut own_orders: Vec<Order> = orders
        .iter()
        .filter(|o| o.game == game && o.user == user)
        .cloned()
        .collect();
    own_orders.sort_by(|a, b| b.id.cmp(&a.id));

    PlayerStatus {
        order_total: own_orders.iter().map(|o| Money::from_units(o.price)).sum(),
        orders: own_orders,
        rebuy_count: rebuys
            .iter()
            .filter(|r| r.game == game && r.user == user)
            .map(|r| i64::from(r.count))
            .sum(),
        final_chips: results
            .iter()
            .find(|r| r.game == game && r.user == user)
            .map(|r| r.final_chips),
    }
}

/// Writes the menu as a `name,price` CSV table.
pub fn write_menu<W: Write>(menu: &[MenuItem], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["name", "price"])?;
    for item in menu {
        csv_writer.write_record([item.name.clone(), item.price.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Writes the breakdown as a `name,quantity,amount` CSV table.
pub fn write_breakdown<W: Write>(items: &[ItemTotal], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["name", "quantity", "amount"])?;
    for item in items {
        csv_writer.write_record([
            item.name.clone(),
            item.quantity.to_string(),
            item.amount.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
