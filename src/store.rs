//! Persistence collaborator for the settlement calculator.
//!
//! [`Store`] is the seam the calculator's callers depend on; [`MemoryStore`]
//! holds every table in memory and is loaded from and saved to CSV files by
//! [`crate::csv_store`].

use crate::error::{LedgerError, Result};
use crate::model::{
    check_rebuy_total, parse_label, parse_order, parse_rebuy, parse_result, ChipResult, Game,
    GameId, GameUpdate, NewGame, Order, ParticipantRow, Rebuy, User, UserId,
};
use log::{debug, info};

/// Outcome of [`Store::upsert_result`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Read and write access to games and the rows recorded against them.
///
/// Every operation naming a game fails with [`LedgerError::GameNotFound`]
/// when the game does not exist. Writes reject chip counts and prices outside
/// the `i32` range, so settling stored rows never overflows.
pub trait Store {
    fn get_game(&self, id: GameId) -> Result<Game>;

    /// All games, newest date first.
    fn list_games(&self) -> Vec<Game>;

    fn list_participants(&self, game: GameId) -> Result<Vec<User>>;

    fn list_orders(&self, game: GameId) -> Result<Vec<Order>>;

    fn list_orders_for(&self, game: GameId, user: UserId) -> Result<Vec<Order>>;

    /// Orders across every game.
    fn list_all_orders(&self) -> Vec<Order>;

    fn list_rebuys(&self, game: GameId) -> Result<Vec<Rebuy>>;

    fn list_results(&self, game: GameId) -> Result<Vec<ChipResult>>;

    /// Creates or replaces the (game, user) chip result. Last write wins.
    fn upsert_result(&mut self, game: GameId, user: UserId, final_chips: i64) -> Result<Upsert>;

    fn create_order(&mut self, game: GameId, user: UserId, name: &str, price: i64)
        -> Result<Order>;

    fn create_rebuy(&mut self, game: GameId, user: UserId, count: u32) -> Result<Rebuy>;
}

/// In-memory tables. Rows keep insertion order.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    pub(crate) users: Vec<User>,
    pub(crate) games: Vec<Game>,
    pub(crate) participants: Vec<ParticipantRow>,
    pub(crate) orders: Vec<Order>,
    pub(crate) rebuys: Vec<Rebuy>,
    pub(crate) results: Vec<ChipResult>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `username`, returning the existing user if already present.
    pub fn add_user(&mut self, username: &str) -> Result<User> {
        let username = parse_label("username", username).map_err(LedgerError::InvalidValue)?;
        if let Some(existing) = self.users.iter().find(|u| u.username == username) {
            debug!("User {} already registered", username);
            return Ok(existing.clone());
        }

        let user = User {
            id: next_id(self.users.iter().map(|u| u.id)),
            username,
        };
        info!("Registered user {} ({})", user.username, user.id);
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Result<User> {
        let username = username.trim();
        self.users
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| LedgerError::UserNotFound(username.to_string()))
    }

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .ok_or(LedgerError::UserIdNotFound(id))
    }

    pub fn create_game(&mut self, new_game: NewGame) -> Result<Game> {
        self.user(new_game.created_by)?;

        let game = Game {
            id: next_id(self.games.iter().map(|g| g.id)),
            name: parse_label("game name", &new_game.name).map_err(LedgerError::InvalidGame)?,
            date: new_game.date,
            table_fee: new_game.table_fee,
            initial_chips: new_game.initial_chips,
            chip_rate: new_game.chip_rate,
            rebuy_chips: new_game.rebuy_chips,
            created_by: new_game.created_by,
        };
        game.validate().map_err(LedgerError::InvalidGame)?;

        info!("Created game {} '{}' on {}", game.id, game.name, game.date);
        self.games.push(game.clone());
        Ok(game)
    }

    /// Edits a game's name and parameters. Existing rows are kept.
    pub fn update_game(&mut self, id: GameId, update: &GameUpdate) -> Result<Game> {
        let game = self
            .games
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or(LedgerError::GameNotFound(id))?;

        let mut edited = game.clone();
        update.apply(&mut edited);
        if let Some(name) = &update.name {
            edited.name = parse_label("game name", name).map_err(LedgerError::InvalidGame)?;
        }
        edited.validate().map_err(LedgerError::InvalidGame)?;

        *game = edited.clone();
        info!("Updated game {}", id);
        Ok(edited)
    }

    /// Adds `user` to the game's participants. Adding twice is a no-op.
    pub fn add_participant(&mut self, game: GameId, user: UserId) -> Result<()> {
        self.ensure_game(game)?;
        self.user(user)?;

        let row = ParticipantRow { game, user };
        if !self.participants.contains(&row) {
            self.participants.push(row);
            info!("User {} joined game {}", user, game);
        }
        Ok(())
    }

    fn ensure_game(&self, id: GameId) -> Result<()> {
        if self.games.iter().any(|g| g.id == id) {
            Ok(())
        } else {
            Err(LedgerError::GameNotFound(id))
        }
    }

    fn ensure_refs(&self, game: GameId, user: UserId) -> Result<()> {
        self.ensure_game(game)?;
        self.user(user)?;
        Ok(())
    }
}

impl Store for MemoryStore {
    fn get_game(&self, id: GameId) -> Result<Game> {
        self.games
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(LedgerError::GameNotFound(id))
    }

    fn list_games(&self) -> Vec<Game> {
        let mut games = self.games.clone();
        games.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        games
    }

    fn list_participants(&self, game: GameId) -> Result<Vec<User>> {
        self.ensure_game(game)?;
        self.participants
            .iter()
            .filter(|p| p.game == game)
            .map(|p| self.user(p.user).cloned())
            .collect()
    }

    fn list_orders(&self, game: GameId) -> Result<Vec<Order>> {
        self.ensure_game(game)?;
        Ok(self
            .orders
            .iter()
            .filter(|o| o.game == game)
            .cloned()
            .collect())
    }

    fn list_orders_for(&self, game: GameId, user: UserId) -> Result<Vec<Order>> {
        self.ensure_game(game)?;
        Ok(self
            .orders
            .iter()
            .filter(|o| o.game == game && o.user == user)
            .cloned()
            .collect())
    }

    fn list_all_orders(&self) -> Vec<Order> {
        self.orders.clone()
    }

    fn list_rebuys(&self, game: GameId) -> Result<Vec<Rebuy>> {
        self.ensure_game(game)?;
        Ok(self
            .rebuys
            .iter()
            .filter(|r| r.game == game)
            .cloned()
            .collect())
    }

    fn list_results(&self, game: GameId) -> Result<Vec<ChipResult>> {
        self.ensure_game(game)?;
        Ok(self
            .results
            .iter()
            .filter(|r| r.game == game)
            .cloned()
            .collect())
    }

    fn upsert_result(&mut self, game: GameId, user: UserId, final_chips: i64) -> Result<Upsert> {
        self.ensure_refs(game, user)?;
        let ChipResult { final_chips, .. } = parse_result(ChipResult {
            game,
            user,
            final_chips,
        })
        .map_err(LedgerError::InvalidValue)?;

        if let Some(existing) = self
            .results
            .iter_mut()
            .find(|r| r.game == game && r.user == user)
        {
            debug!(
                "Game {}: user {} final chips {} -> {}",
                game, user, existing.final_chips, final_chips
            );
            existing.final_chips = final_chips;
            return Ok(Upsert::Updated);
        }

        self.results.push(ChipResult {
            game,
            user,
            final_chips,
        });
        info!("Game {}: user {} registered {} chips", game, user, final_chips);
        Ok(Upsert::Created)
    }

    fn create_order(
        &mut self,
        game: GameId,
        user: UserId,
        name: &str,
        price: i64,
    ) -> Result<Order> {
        self.ensure_refs(game, user)?;

        let order = parse_order(Order {
            id: next_id(self.orders.iter().map(|o| o.id)),
            game,
            user,
            name: name.to_string(),
            price,
        })
        .map_err(LedgerError::InvalidValue)?;
        info!(
            "Game {}: user {} ordered {} for {}",
            game, user, order.name, price
        );
        self.orders.push(order.clone());
        Ok(order)
    }

    fn create_rebuy(&mut self, game: GameId, user: UserId, count: u32) -> Result<Rebuy> {
        self.ensure_refs(game, user)?;

        let rebuy = parse_rebuy(Rebuy {
            id: next_id(self.rebuys.iter().map(|r| r.id)),
            game,
            user,
            count,
        })
        .map_err(|_| LedgerError::InvalidRebuyCount(count))?;
        check_rebuy_total(&self.rebuys, &rebuy).map_err(LedgerError::InvalidValue)?;

        info!("Game {}: user {} rebought x{}", game, user, count);
        self.rebuys.push(rebuy.clone());
        Ok(rebuy)
    }
}

fn next_id(ids: impl Iterator<Item = u32>) -> u32 {
    ids.max().map_or(1, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use chrono::NaiveDate;

    fn new_game(created_by: UserId, date: (i32, u32, u32)) -> NewGame {
        NewGame {
            name: "Friday".to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            table_fee: 3000,
            initial_chips: 1000,
            chip_rate: Money::from_units(1),
            rebuy_chips: 500,
            created_by,
        }
    }

    fn store_with_game() -> (MemoryStore, Game, User) {
        let mut store = MemoryStore::new();
        let alice = store.add_user("alice").unwrap();
        let game = store.create_game(new_game(alice.id, (2026, 10, 16))).unwrap();
        store.add_participant(game.id, alice.id).unwrap();
        (store, game, alice)
    }

    #[test]
    fn test_upsert_result_creates_then_updates() {
        let (mut store, game, alice) = store_with_game();

        assert_eq!(
            store.upsert_result(game.id, alice.id, 1200).unwrap(),
            Upsert::Created
        );
        assert_eq!(
            store.upsert_result(game.id, alice.id, 900).unwrap(),
            Upsert::Updated
        );

        let results = store.list_results(game.id).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].final_chips, 900);
    }

    #[test]
    fn test_add_user_is_idempotent() {
        let mut store = MemoryStore::new();
        let first = store.add_user("alice").unwrap();
        let second = store.add_user(" alice ").unwrap();

        assert_eq!(first, second);
        assert_eq!(store.users.len(), 1);
        assert!(store.add_user("  ").is_err());
    }

    #[test]
    fn test_add_participant_twice_keeps_one_row() {
        let (mut store, game, alice) = store_with_game();
        store.add_participant(game.id, alice.id).unwrap();

        assert_eq!(store.list_participants(game.id).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_game_is_not_found() {
        let (mut store, _, alice) = store_with_game();

        assert!(matches!(
            store.get_game(99),
            Err(LedgerError::GameNotFound(99))
        ));
        assert!(matches!(
            store.create_order(99, alice.id, "beer", 500),
            Err(LedgerError::GameNotFound(99))
        ));
        assert!(matches!(
            store.upsert_result(99, alice.id, 1000),
            Err(LedgerError::GameNotFound(99))
        ));
    }

    #[test]
    fn test_unknown_user_is_rejected() {
        let (mut store, game, _) = store_with_game();

        assert!(matches!(
            store.create_rebuy(game.id, 42, 1),
            Err(LedgerError::UserIdNotFound(42))
        ));
        assert!(matches!(
            store.find_user("nobody"),
            Err(LedgerError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_rebuy_count_must_be_positive() {
        let (mut store, game, alice) = store_with_game();

        assert!(matches!(
            store.create_rebuy(game.id, alice.id, 0),
            Err(LedgerError::InvalidRebuyCount(0))
        ));
        // Larger counts than the CLI offers are still valid data.
        assert_eq!(store.create_rebuy(game.id, alice.id, 5).unwrap().count, 5);
        assert!(matches!(
            store.create_rebuy(game.id, alice.id, 3_000_000_000),
            Err(LedgerError::InvalidRebuyCount(3_000_000_000))
        ));
    }

    #[test]
    fn test_rebuy_total_per_player_is_bounded() {
        let (mut store, game, alice) = store_with_game();
        let bob = store.add_user("bob").unwrap();

        store.create_rebuy(game.id, alice.id, 2_000_000_000).unwrap();
        assert!(matches!(
            store.create_rebuy(game.id, alice.id, 200_000_000),
            Err(LedgerError::InvalidValue(_))
        ));
        // Other players keep their own budget.
        store.create_rebuy(game.id, bob.id, 2_000_000_000).unwrap();
        assert_eq!(store.list_rebuys(game.id).unwrap().len(), 2);
    }

    #[test]
    fn test_out_of_range_price_and_chips_are_rejected() {
        let (mut store, game, alice) = store_with_game();

        assert!(matches!(
            store.create_order(game.id, alice.id, "beer", i64::MAX),
            Err(LedgerError::InvalidValue(_))
        ));
        assert!(matches!(
            store.upsert_result(game.id, alice.id, 9_000_000_000_000_000_000),
            Err(LedgerError::InvalidValue(_))
        ));
        assert!(store.list_all_orders().is_empty());
        assert!(store.list_results(game.id).unwrap().is_empty());

        // Negative prices (refunds) and chip counts at the bounds are fine.
        store.create_order(game.id, alice.id, "refund", -500).unwrap();
        assert_eq!(
            store
                .upsert_result(game.id, alice.id, i64::from(i32::MIN))
                .unwrap(),
            Upsert::Created
        );
    }

    #[test]
    fn test_create_game_rejects_oversized_parameters() {
        let mut store = MemoryStore::new();
        let alice = store.add_user("alice").unwrap();

        let mut params = new_game(alice.id, (2026, 10, 16));
        params.rebuy_chips = i64::from(i32::MAX) + 1;
        assert!(matches!(
            store.create_game(params),
            Err(LedgerError::InvalidGame(_))
        ));

        let mut params = new_game(alice.id, (2026, 10, 16));
        params.chip_rate = Money::new(rust_decimal::Decimal::from(100_000_000_i64));
        assert!(matches!(
            store.create_game(params),
            Err(LedgerError::InvalidGame(_))
        ));
        assert!(store.list_games().is_empty());
    }

    #[test]
    fn test_orders_get_sequential_ids() {
        let (mut store, game, alice) = store_with_game();
        let first = store.create_order(game.id, alice.id, "beer", 500).unwrap();
        let second = store.create_order(game.id, alice.id, "fries", 700).unwrap();

        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.list_orders_for(game.id, alice.id).unwrap().len(), 2);
    }

    #[test]
    fn test_list_games_newest_first() {
        let (mut store, older, alice) = store_with_game();
        let newer = store.create_game(new_game(alice.id, (2026, 10, 23))).unwrap();
        let same_day = store.create_game(new_game(alice.id, (2026, 10, 23))).unwrap();

        let ids: Vec<GameId> = store.list_games().iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![same_day.id, newer.id, older.id]);
    }

    #[test]
    fn test_update_game_validates() {
        let (mut store, game, _) = store_with_game();

        let update = GameUpdate {
            table_fee: Some(-5),
            ..GameUpdate::default()
        };
        assert!(matches!(
            store.update_game(game.id, &update),
            Err(LedgerError::InvalidGame(_))
        ));
        assert_eq!(store.get_game(game.id).unwrap().table_fee, 3000);

        let update = GameUpdate {
            name: Some("Saturday".to_string()),
            rebuy_chips: Some(1000),
            ..GameUpdate::default()
        };
        let edited = store.update_game(game.id, &update).unwrap();
        assert_eq!(edited.name, "Saturday");
        assert_eq!(edited.rebuy_chips, 1000);
    }

    #[test]
    fn test_create_game_rejects_negative_fee() {
        let mut store = MemoryStore::new();
        let alice = store.add_user("alice").unwrap();
        let mut params = new_game(alice.id, (2026, 10, 16));
        params.table_fee = -100;

        assert!(store.create_game(params).is_err());
        assert!(store.list_games().is_empty());
    }
}
