//! Settlement properties exercised through the public library API.

use chrono::NaiveDate;
use poker_ledger::{
    compute_settlement, settle, ChipResult, Game, LedgerError, MemoryStore, Money, NewGame, Order,
    Rebuy, SettlementLine, Store, Upsert, User,
};
use std::str::FromStr;

fn game(table_fee: i64, initial_chips: i64, chip_rate: &str, rebuy_chips: i64) -> Game {
    Game {
        id: 7,
        name: "Home game".to_string(),
        date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        table_fee,
        initial_chips,
        chip_rate: Money::from_str(chip_rate).unwrap(),
        rebuy_chips,
        created_by: 1,
    }
}

fn users(count: u32) -> Vec<User> {
    (1..=count)
        .map(|id| User {
            id,
            username: format!("player{}", id),
        })
        .collect()
}

fn rebuy(id: u32, user: u32, count: u32) -> Rebuy {
    Rebuy {
        id,
        game: 7,
        user,
        count,
    }
}

fn result(user: u32, final_chips: i64) -> ChipResult {
    ChipResult {
        game: 7,
        user,
        final_chips,
    }
}

fn order(id: u32, user: u32, price: i64) -> Order {
    Order {
        id,
        game: 7,
        user,
        name: format!("item{}", id),
        price,
    }
}

// ==================== BALANCE ====================

#[test]
fn test_closed_chip_economy_is_balanced() {
    let game = game(5000, 2000, "0.25", 1000);
    let players = users(4);
    let rebuys = [rebuy(1, 1, 1), rebuy(2, 1, 2), rebuy(3, 3, 1)];
    // 4 * 2000 starting chips + 4 rebuy units * 1000 = 12000 chips on the table
    let results = [
        result(1, 500),
        result(2, 6500),
        result(3, 4000),
        result(4, 1000),
    ];

    let report = compute_settlement(&game, &players, &[], &rebuys, &results);

    assert_eq!(report.totals.total_chip_diff, 0);
    assert!(report.totals.is_balanced);

    // Chip money nets out, so payments add up to exactly the shop total.
    let payments: Money = report
        .lines
        .iter()
        .filter_map(SettlementLine::settled)
        .map(|l| l.final_payment)
        .sum();
    assert_eq!(payments, report.totals.shop_total);
}

#[test]
fn test_missing_chips_are_unbalanced() {
    let game = game(0, 1000, "1", 500);
    let report = compute_settlement(&game, &users(2), &[], &[], &[result(1, 1000), result(2, 900)]);

    assert_eq!(report.totals.total_chip_diff, -100);
    assert!(!report.totals.is_balanced);
}

// ==================== PARTICIPANTS ====================

#[test]
fn test_no_participants() {
    let game = game(3000, 1000, "1", 500);
    let orders = [order(1, 1, 800)];

    let report = compute_settlement(&game, &[], &orders, &[], &[]);

    assert!(report.table_share.is_zero());
    assert!(report.lines.is_empty());
    assert_eq!(report.totals.total_orders, Money::from_units(800));
    assert_eq!(report.totals.shop_total, Money::from_units(3800));
}

#[test]
fn test_unregistered_line_has_no_financial_fields() {
    let game = game(3000, 1000, "1", 500);
    let players = users(3);
    let rebuys = [rebuy(1, 2, 3)];

    let report = compute_settlement(&game, &players, &[], &rebuys, &[result(1, 1000)]);

    assert_eq!(
        report.lines[1],
        SettlementLine::Unregistered {
            user: "player2".to_string()
        }
    );
    assert!(report.lines[2].is_unregistered());
    assert_eq!(report.totals.total_chip_diff, 0);
    // Table share still divides by every participant, registered or not.
    assert_eq!(report.table_share, Money::from_units(1000));
}

#[test]
fn test_total_orders_counts_every_row() {
    let game = game(0, 1000, "1", 500);
    let players = users(2);
    // player3 is not even a participant.
    let orders = [order(1, 1, 100), order(2, 2, 250), order(3, 3, 50)];

    let report = compute_settlement(&game, &players, &orders, &[], &[result(1, 1000)]);

    assert_eq!(report.totals.total_orders, Money::from_units(400));
    let registered = report.lines[0].settled().unwrap();
    assert_eq!(registered.order_total, Money::from_units(100));
}

#[test]
fn test_negative_payment_means_player_is_owed() {
    let game = game(1000, 1000, "1", 500);
    let report = compute_settlement(&game, &users(2), &[], &[], &[result(1, 2000), result(2, 0)]);

    let winner = report.lines[0].settled().unwrap();
    assert_eq!(winner.final_payment, Money::from_units(-500));
    assert!(winner.final_payment.is_negative());
}

// ==================== STORE ====================

fn scenario_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    let a = store.add_user("A").unwrap();
    let b = store.add_user("B").unwrap();
    let game = store
        .create_game(NewGame {
            name: "Scenario".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
            table_fee: 3000,
            initial_chips: 1000,
            chip_rate: Money::from_str("1.0").unwrap(),
            rebuy_chips: 500,
            created_by: a.id,
        })
        .unwrap();
    store.add_participant(game.id, a.id).unwrap();
    store.add_participant(game.id, b.id).unwrap();
    store.create_order(game.id, a.id, "beer", 500).unwrap();
    store.create_rebuy(game.id, a.id, 1).unwrap();
    store.upsert_result(game.id, a.id, 1800).unwrap();
    store.upsert_result(game.id, b.id, 700).unwrap();
    store
}

#[test]
fn test_scenario_through_store() {
    let store = scenario_store();
    let report = settle(&store, 1).unwrap();

    let a = report.lines[0].settled().unwrap();
    assert_eq!(a.user, "A");
    assert_eq!(a.start_chips, 1500);
    assert_eq!(a.chip_diff, 300);
    assert_eq!(a.final_payment, Money::from_units(1700));

    let b = report.lines[1].settled().unwrap();
    assert_eq!(b.chip_diff, -300);
    assert_eq!(b.final_payment, Money::from_units(1800));

    assert!(report.totals.is_balanced);
    assert_eq!(report.totals.total_orders, Money::from_units(500));
    assert_eq!(report.totals.shop_total, Money::from_units(3500));
}

#[test]
fn test_settle_is_idempotent() {
    let store = scenario_store();
    assert_eq!(settle(&store, 1).unwrap(), settle(&store, 1).unwrap());
}

#[test]
fn test_settle_unknown_game() {
    let store = scenario_store();
    assert!(matches!(settle(&store, 2), Err(LedgerError::GameNotFound(2))));
}

#[test]
fn test_resubmitted_result_replaces_previous() {
    let mut store = scenario_store();
    let b = store.find_user("B").unwrap();

    assert_eq!(store.upsert_result(1, b.id, 650).unwrap(), Upsert::Updated);
    assert_eq!(store.list_results(1).unwrap().len(), 2);

    let report = settle(&store, 1).unwrap();
    assert_eq!(report.totals.total_chip_diff, -50);
}
