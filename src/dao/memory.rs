//! In-memory round store used by the binary in development and by tests.
//!
//! It enforces the same phase preconditions a database backend must enforce, so drivers and
//! recovery behave identically against it.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use futures::future::BoxFuture;
use rand::Rng;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    dao::{
        models::{
            ActiveGame, PlayerScore, PlayerWithRole, PlayerWithVoting, QuestionSnapshot,
            RevealSnapshot, RoomPlayer, ScoreSnapshot, VotingSnapshot, WinnerSnapshot,
        },
        round_store::{RecoveryStore, RoundError, RoundResult, RoundStore},
        storage::StorageResult,
    },
    state::game::{
        GamePhase, GameStateId, MAX_ROUNDS, PlayerId, PlayerRole, RoomId, RoundType, Scoring,
    },
};

/// A normal question paired with the question only the fibber sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionPair {
    /// Question shown to normal players.
    pub normal: String,
    /// Question shown to the fibber.
    pub fibber: String,
}

impl QuestionPair {
    /// Build a pair from two string slices.
    pub fn new(normal: &str, fibber: &str) -> Self {
        Self {
            normal: normal.to_string(),
            fibber: fibber.to_string(),
        }
    }
}

/// Identifiers of a freshly created game.
#[derive(Debug, Clone)]
pub struct CreatedGame {
    /// Game identifier.
    pub game_state_id: GameStateId,
    /// Room hosting the game.
    pub room_id: RoomId,
    /// Players in join order.
    pub player_ids: Vec<PlayerId>,
}

#[derive(Debug, Clone)]
struct StoredPlayer {
    id: PlayerId,
    nickname: String,
    score: i64,
}

#[derive(Debug, Clone)]
struct StoredRound {
    number: u32,
    round_type: RoundType,
    question: QuestionPair,
    fibber: PlayerId,
    answers: HashMap<PlayerId, String>,
    // voter -> voted for
    votes: HashMap<PlayerId, PlayerId>,
    scored: bool,
}

#[derive(Debug, Clone)]
struct StoredGame {
    room_id: RoomId,
    room_code: String,
    phase: GamePhase,
    finished: bool,
    deadline: OffsetDateTime,
    players: Vec<StoredPlayer>,
    rounds: Vec<StoredRound>,
}

impl StoredGame {
    fn current_round(&self) -> RoundResult<&StoredRound> {
        self.rounds
            .last()
            .ok_or_else(|| crate::dao::storage::StorageError::query("game has no rounds").into())
    }

    fn vote_counts(&self, round: &StoredRound) -> HashMap<PlayerId, u32> {
        let mut counts = HashMap::new();
        for voted_for in round.votes.values() {
            *counts.entry(*voted_for).or_insert(0) += 1;
        }
        counts
    }

    /// Player every other player voted for, if such a player exists.
    fn unanimous_pick(&self, round: &StoredRound) -> Option<&StoredPlayer> {
        let needed = self.players.len().saturating_sub(1) as u32;
        if needed == 0 {
            return None;
        }
        let counts = self.vote_counts(round);
        self.players
            .iter()
            .find(|player| counts.get(&player.id).copied() == Some(needed))
    }

    fn most_voted(&self, round: &StoredRound) -> Option<&StoredPlayer> {
        let counts = self.vote_counts(round);
        self.players
            .iter()
            .filter(|player| counts.contains_key(&player.id))
            .max_by_key(|player| counts[&player.id])
    }

    fn leaderboard(&self) -> Vec<PlayerScore> {
        let mut players: Vec<PlayerScore> = self
            .players
            .iter()
            .map(|player| PlayerScore {
                player_id: player.id,
                nickname: player.nickname.clone(),
                score: player.score,
            })
            .collect();
        players.sort_by(|a, b| b.score.cmp(&a.score));
        players
    }
}

#[derive(Default)]
struct Inner {
    games: HashMap<GameStateId, StoredGame>,
    locks: HashSet<GameStateId>,
    question_bank: HashMap<RoundType, Vec<QuestionPair>>,
}

impl Inner {
    fn live_game(&mut self, id: GameStateId) -> RoundResult<&mut StoredGame> {
        match self.games.get_mut(&id) {
            Some(game) if !game.finished => Ok(game),
            _ => Err(RoundError::GameNotFound(id)),
        }
    }

    fn pick_question(&self, round_type: RoundType, number: u32) -> RoundResult<QuestionPair> {
        let bank = self
            .question_bank
            .get(&round_type)
            .filter(|bank| !bank.is_empty())
            .ok_or(RoundError::NoEligibleQuestions(round_type))?;
        let index = (number.saturating_sub(1) as usize) % bank.len();
        Ok(bank[index].clone())
    }
}

/// Round store keeping every game in process memory.
#[derive(Clone)]
pub struct InMemoryRoundStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for InMemoryRoundStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoundStore {
    /// Create a store with the built-in question bank.
    pub fn new() -> Self {
        Self::with_question_bank(default_question_bank())
    }

    /// Create a store with a custom question bank.
    pub fn with_question_bank(question_bank: HashMap<RoundType, Vec<QuestionPair>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                question_bank,
                ..Inner::default()
            })),
        }
    }

    /// Start a game in the question phase of the first free-form round.
    pub async fn create_game(
        &self,
        room_code: &str,
        nicknames: &[&str],
        deadline: OffsetDateTime,
    ) -> RoundResult<CreatedGame> {
        let mut inner = self.inner.lock().await;
        let question = inner.pick_question(RoundType::FreeForm, 1)?;
        let players: Vec<StoredPlayer> = nicknames
            .iter()
            .map(|nickname| StoredPlayer {
                id: PlayerId::new(),
                nickname: nickname.to_string(),
                score: 0,
            })
            .collect();
        let fibber = pick_fibber(&players)?;

        let created = CreatedGame {
            game_state_id: GameStateId::new(),
            room_id: RoomId::new(),
            player_ids: players.iter().map(|player| player.id).collect(),
        };
        inner.games.insert(
            created.game_state_id,
            StoredGame {
                room_id: created.room_id,
                room_code: room_code.to_string(),
                phase: GamePhase::Question,
                finished: false,
                deadline,
                players,
                rounds: vec![StoredRound {
                    number: 1,
                    round_type: RoundType::FreeForm,
                    question,
                    fibber,
                    answers: HashMap::new(),
                    votes: HashMap::new(),
                    scored: false,
                }],
            },
        );
        Ok(created)
    }

    /// Record a player's answer for the current round.
    pub async fn submit_answer(
        &self,
        game_state_id: GameStateId,
        player_id: PlayerId,
        answer: &str,
    ) -> RoundResult<()> {
        let mut inner = self.inner.lock().await;
        let game = inner.live_game(game_state_id)?;
        if game.phase != GamePhase::Question {
            return Err(RoundError::NotInExpectedPhase {
                expected: GamePhase::Question,
                actual: game.phase,
            });
        }
        if let Some(round) = game.rounds.last_mut() {
            round.answers.insert(player_id, answer.to_string());
        }
        Ok(())
    }

    /// Record a vote for the current round.
    pub async fn submit_vote(
        &self,
        game_state_id: GameStateId,
        voter: PlayerId,
        voted_for: PlayerId,
    ) -> RoundResult<()> {
        let mut inner = self.inner.lock().await;
        let game = inner.live_game(game_state_id)?;
        if game.phase != GamePhase::Voting {
            return Err(RoundError::NotInExpectedPhase {
                expected: GamePhase::Voting,
                actual: game.phase,
            });
        }
        if let Some(round) = game.rounds.last_mut() {
            round.votes.insert(voter, voted_for);
        }
        Ok(())
    }

    /// Fibber of the current round.
    pub async fn current_fibber(&self, game_state_id: GameStateId) -> RoundResult<PlayerId> {
        let mut inner = self.inner.lock().await;
        let game = inner.live_game(game_state_id)?;
        Ok(game.current_round()?.fibber)
    }

    /// Whether the winner phase already finished the game.
    pub async fn is_finished(&self, game_state_id: GameStateId) -> bool {
        let inner = self.inner.lock().await;
        inner
            .games
            .get(&game_state_id)
            .is_some_and(|game| game.finished)
    }

    /// Whether a recovery lock is currently held for the game.
    pub async fn is_locked(&self, game_state_id: GameStateId) -> bool {
        self.inner.lock().await.locks.contains(&game_state_id)
    }
}

impl RoundStore for InMemoryRoundStore {
    fn transition_to_question(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        next_round: bool,
    ) -> BoxFuture<'static, RoundResult<QuestionSnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            if game.phase == GamePhase::Question {
                return question_snapshot(game_state_id, game);
            }
            if !matches!(game.phase, GamePhase::RevealRole | GamePhase::Scoring) {
                return Err(RoundError::NotInExpectedPhase {
                    expected: if next_round {
                        GamePhase::Scoring
                    } else {
                        GamePhase::RevealRole
                    },
                    actual: game.phase,
                });
            }

            let latest = game.current_round()?.clone();
            let mut round_type = latest.round_type;
            let mut number = latest.number + 1;
            let mut fibber = latest.fibber;
            if number == MAX_ROUNDS + 1 || next_round {
                round_type = latest.round_type.next().ok_or(RoundError::GameCompleted)?;
                number = 1;
                fibber = pick_fibber(&game.players)?;
            }

            let question = inner.pick_question(round_type, number)?;
            let game = inner.live_game(game_state_id)?;
            game.rounds.push(StoredRound {
                number,
                round_type,
                question,
                fibber,
                answers: HashMap::new(),
                votes: HashMap::new(),
                scored: false,
            });
            game.phase = GamePhase::Question;
            game.deadline = deadline;
            question_snapshot(game_state_id, game)
        })
    }

    fn transition_to_voting(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<VotingSnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            advance(game, GamePhase::Voting, &[GamePhase::Question], deadline)?;
            voting_snapshot(game_state_id, game)
        })
    }

    fn transition_to_reveal(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<RevealSnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            advance(game, GamePhase::RevealRole, &[GamePhase::Voting], deadline)?;
            reveal_snapshot(game_state_id, game)
        })
    }

    fn transition_to_scoring(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        scoring: Scoring,
    ) -> BoxFuture<'static, RoundResult<ScoreSnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            advance(game, GamePhase::Scoring, &[GamePhase::RevealRole], deadline)?;
            award_points(game, scoring)?;
            score_snapshot(game_state_id, game)
        })
    }

    fn transition_to_winner(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<WinnerSnapshot>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            // Most-likely rounds skip scoring and end straight from the reveal.
            let most_likely = game.current_round()?.round_type == RoundType::MostLikely;
            let allowed: &[GamePhase] = if most_likely {
                &[GamePhase::Scoring, GamePhase::RevealRole]
            } else {
                &[GamePhase::Scoring]
            };
            advance(game, GamePhase::Winner, allowed, deadline)?;
            Ok(WinnerSnapshot {
                game_state_id,
                players: game.leaderboard(),
                deadline: game.deadline,
            })
        })
    }

    fn finish_game(&self, game_state_id: GameStateId) -> BoxFuture<'static, RoundResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            let game = inner.live_game(game_state_id)?;
            if game.phase != GamePhase::Winner {
                return Err(RoundError::NotInExpectedPhase {
                    expected: GamePhase::Winner,
                    actual: game.phase,
                });
            }
            game.finished = true;
            Ok(())
        })
    }

    fn current_phase(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, RoundResult<GamePhase>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut inner = inner.lock().await;
            Ok(inner.live_game(game_state_id)?.phase)
        })
    }
}

impl RecoveryStore for InMemoryRoundStore {
    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<ActiveGame>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let inner = inner.lock().await;
            Ok(inner
                .games
                .iter()
                .filter(|(_, game)| !game.finished)
                .map(|(id, game)| ActiveGame {
                    game_state_id: *id,
                    room_id: game.room_id,
                    room_code: game.room_code.clone(),
                    phase: game.phase.as_str().to_string(),
                    submit_deadline: game.deadline,
                })
                .collect())
        })
    }

    fn try_acquire_game_lock(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.lock().await.locks.insert(game_state_id)) })
    }

    fn release_game_lock(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.lock().await.locks.remove(&game_state_id);
            Ok(())
        })
    }

    fn list_players_in_room(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayer>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let inner = inner.lock().await;
            Ok(inner
                .games
                .values()
                .filter(|game| game.room_id == room_id)
                .flat_map(|game| game.players.iter())
                .map(|player| RoomPlayer {
                    player_id: player.id,
                    nickname: player.nickname.clone(),
                })
                .collect())
        })
    }
}

/// Move `game` to `target` when it sits in one of `from`; a no-op when already in `target`.
fn advance(
    game: &mut StoredGame,
    target: GamePhase,
    from: &[GamePhase],
    deadline: OffsetDateTime,
) -> RoundResult<()> {
    if game.phase == target {
        return Ok(());
    }
    if !from.contains(&game.phase) {
        return Err(RoundError::NotInExpectedPhase {
            expected: from[0],
            actual: game.phase,
        });
    }
    game.phase = target;
    game.deadline = deadline;
    Ok(())
}

fn award_points(game: &mut StoredGame, scoring: Scoring) -> RoundResult<()> {
    let round = game.current_round()?.clone();
    if round.scored {
        return Ok(());
    }

    let caught = game
        .unanimous_pick(&round)
        .is_some_and(|player| player.id == round.fibber);
    for player in game.players.iter_mut() {
        if caught {
            if round.votes.get(&player.id) == Some(&round.fibber) {
                player.score += scoring.guessed_fibber;
            }
        } else if player.id == round.fibber {
            player.score += scoring.fibber_evade_capture;
        }
    }
    if let Some(round) = game.rounds.last_mut() {
        round.scored = true;
    }
    Ok(())
}

fn pick_fibber(players: &[StoredPlayer]) -> RoundResult<PlayerId> {
    if players.is_empty() {
        return Err(crate::dao::storage::StorageError::query("game has no players").into());
    }
    let index = rand::rng().random_range(0..players.len());
    Ok(players[index].id)
}

fn question_snapshot(id: GameStateId, game: &StoredGame) -> RoundResult<QuestionSnapshot> {
    let round = game.current_round()?;
    let players = game
        .players
        .iter()
        .map(|player| {
            let is_fibber = player.id == round.fibber;
            PlayerWithRole {
                player_id: player.id,
                nickname: player.nickname.clone(),
                role: if is_fibber {
                    PlayerRole::Fibber
                } else {
                    PlayerRole::Normal
                },
                question: if is_fibber {
                    round.question.fibber.clone()
                } else {
                    round.question.normal.clone()
                },
                is_answer_ready: round.answers.contains_key(&player.id),
            }
        })
        .collect();
    Ok(QuestionSnapshot {
        game_state_id: id,
        room_code: game.room_code.clone(),
        round: round.number,
        round_type: round.round_type,
        players,
        deadline: game.deadline,
    })
}

fn voting_snapshot(id: GameStateId, game: &StoredGame) -> RoundResult<VotingSnapshot> {
    let round = game.current_round()?;
    let counts = game.vote_counts(round);
    let players = game
        .players
        .iter()
        .map(|player| PlayerWithVoting {
            player_id: player.id,
            nickname: player.nickname.clone(),
            votes: counts.get(&player.id).copied().unwrap_or(0),
            answer: round.answers.get(&player.id).cloned().unwrap_or_default(),
        })
        .collect();
    Ok(VotingSnapshot {
        game_state_id: id,
        round: round.number,
        question: round.question.normal.clone(),
        players,
        deadline: game.deadline,
    })
}

fn reveal_snapshot(id: GameStateId, game: &StoredGame) -> RoundResult<RevealSnapshot> {
    let round = game.current_round()?;
    let revealed = game.unanimous_pick(round);
    let voted_for = revealed.or_else(|| game.most_voted(round));
    let role_of = |player: &StoredPlayer| {
        if player.id == round.fibber {
            PlayerRole::Fibber
        } else {
            PlayerRole::Normal
        }
    };
    Ok(RevealSnapshot {
        game_state_id: id,
        round: round.number,
        round_type: round.round_type,
        should_reveal: revealed.is_some(),
        voted_for_player_id: voted_for.map(|player| player.id),
        voted_for_nickname: voted_for.map(|player| player.nickname.clone()),
        voted_for_role: voted_for.map(role_of),
        deadline: game.deadline,
    })
}

fn score_snapshot(id: GameStateId, game: &StoredGame) -> RoundResult<ScoreSnapshot> {
    let round = game.current_round()?;
    let fibber_caught = game
        .unanimous_pick(round)
        .is_some_and(|player| player.id == round.fibber);
    Ok(ScoreSnapshot {
        game_state_id: id,
        round_number: round.number,
        total_rounds: round.number,
        round_type: round.round_type,
        fibber_caught,
        players: game.leaderboard(),
        deadline: game.deadline,
    })
}

/// Question bank shipped with the binary.
pub fn default_question_bank() -> HashMap<RoundType, Vec<QuestionPair>> {
    HashMap::from([
        (
            RoundType::FreeForm,
            vec![
                QuestionPair::new(
                    "What is your favourite holiday destination?",
                    "What is the worst place you have ever visited?",
                ),
                QuestionPair::new(
                    "What would you cook to impress a date?",
                    "What would you eat at 3am?",
                ),
                QuestionPair::new(
                    "What is the best film of all time?",
                    "What film made you fall asleep?",
                ),
            ],
        ),
        (
            RoundType::MultipleChoice,
            vec![
                QuestionPair::new("Cats are better than dogs", "Pineapple belongs on pizza"),
                QuestionPair::new("Mornings are the best time of day", "Socks with sandals are fine"),
                QuestionPair::new("Board games beat video games", "Cold showers are enjoyable"),
            ],
        ),
        (
            RoundType::MostLikely,
            vec![
                QuestionPair::new(
                    "Who is most likely to become famous?",
                    "Who is most likely to get lost in their own town?",
                ),
                QuestionPair::new(
                    "Who is most likely to adopt ten cats?",
                    "Who is most likely to forget a birthday?",
                ),
                QuestionPair::new(
                    "Who is most likely to win a cooking contest?",
                    "Who is most likely to burn toast?",
                ),
            ],
        ),
    ])
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    fn soon() -> OffsetDateTime {
        OffsetDateTime::now_utc() + Duration::seconds(30)
    }

    async fn game_in_voting(store: &InMemoryRoundStore) -> CreatedGame {
        let game = store
            .create_game("ABCD", &["ada", "bob", "cyd"], soon())
            .await
            .unwrap();
        store
            .transition_to_voting(game.game_state_id, soon())
            .await
            .unwrap();
        game
    }

    #[tokio::test]
    async fn transitions_enforce_the_expected_predecessor() {
        let store = InMemoryRoundStore::new();
        let game = store
            .create_game("ABCD", &["ada", "bob", "cyd"], soon())
            .await
            .unwrap();

        let err = store
            .transition_to_reveal(game.game_state_id, soon())
            .await
            .unwrap_err();
        match err {
            RoundError::NotInExpectedPhase { expected, actual } => {
                assert_eq!(expected, GamePhase::Voting);
                assert_eq!(actual, GamePhase::Question);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeating_a_transition_returns_the_persisted_deadline() {
        let store = InMemoryRoundStore::new();
        let game = store
            .create_game("ABCD", &["ada", "bob", "cyd"], soon())
            .await
            .unwrap();
        let first_deadline = soon();
        let first = store
            .transition_to_voting(game.game_state_id, first_deadline)
            .await
            .unwrap();
        let later = first_deadline + Duration::minutes(5);
        let second = store
            .transition_to_voting(game.game_state_id, later)
            .await
            .unwrap();

        assert_eq!(first.deadline, first_deadline);
        assert_eq!(second.deadline, first_deadline);
    }

    #[tokio::test]
    async fn unanimous_vote_on_the_fibber_reveals_and_scores_voters() {
        let store = InMemoryRoundStore::new();
        let game = game_in_voting(&store).await;
        let id = game.game_state_id;
        let fibber = store.current_fibber(id).await.unwrap();
        for voter in game.player_ids.iter().filter(|p| **p != fibber) {
            store.submit_vote(id, *voter, fibber).await.unwrap();
        }

        let reveal = store.transition_to_reveal(id, soon()).await.unwrap();
        assert!(reveal.should_reveal);
        assert_eq!(reveal.voted_for_role, Some(PlayerRole::Fibber));

        let scoring = Scoring::default();
        let scores = store
            .transition_to_scoring(id, soon(), scoring)
            .await
            .unwrap();
        assert!(scores.fibber_caught);
        let fibber_score = scores
            .players
            .iter()
            .find(|p| p.player_id == fibber)
            .unwrap();
        assert_eq!(fibber_score.score, 0);
        assert!(
            scores
                .players
                .iter()
                .filter(|p| p.player_id != fibber)
                .all(|p| p.score == scoring.guessed_fibber)
        );

        // Re-entering scoring must not award points twice.
        let again = store
            .transition_to_scoring(id, soon(), scoring)
            .await
            .unwrap();
        assert_eq!(again.players, scores.players);
    }

    #[tokio::test]
    async fn fibber_evading_capture_gets_points() {
        let store = InMemoryRoundStore::new();
        let game = game_in_voting(&store).await;
        let id = game.game_state_id;
        store.transition_to_reveal(id, soon()).await.unwrap();
        let scores = store
            .transition_to_scoring(id, soon(), Scoring::default())
            .await
            .unwrap();

        let fibber = store.current_fibber(id).await.unwrap();
        assert!(!scores.fibber_caught);
        assert_eq!(scores.players[0].player_id, fibber);
        assert_eq!(scores.players[0].score, Scoring::default().fibber_evade_capture);
    }

    #[tokio::test]
    async fn next_round_moves_to_the_next_round_type() {
        let store = InMemoryRoundStore::new();
        let game = game_in_voting(&store).await;
        let id = game.game_state_id;
        store.transition_to_reveal(id, soon()).await.unwrap();
        store
            .transition_to_scoring(id, soon(), Scoring::default())
            .await
            .unwrap();

        let question = store
            .transition_to_question(id, soon(), true)
            .await
            .unwrap();
        assert_eq!(question.round, 1);
        assert_eq!(question.round_type, RoundType::MultipleChoice);
        assert_eq!(
            question
                .players
                .iter()
                .filter(|p| p.role == PlayerRole::Fibber)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn continuing_a_round_keeps_the_fibber() {
        let store = InMemoryRoundStore::new();
        let game = game_in_voting(&store).await;
        let id = game.game_state_id;
        let fibber = store.current_fibber(id).await.unwrap();
        store.transition_to_reveal(id, soon()).await.unwrap();

        let question = store
            .transition_to_question(id, soon(), false)
            .await
            .unwrap();
        assert_eq!(question.round, 2);
        assert_eq!(question.round_type, RoundType::FreeForm);
        assert_eq!(store.current_fibber(id).await.unwrap(), fibber);
    }

    #[tokio::test]
    async fn empty_question_bank_is_reported() {
        let store = InMemoryRoundStore::with_question_bank(HashMap::from([(
            RoundType::FreeForm,
            vec![QuestionPair::new("a", "b")],
        )]));
        let game = game_in_voting(&store).await;
        let id = game.game_state_id;
        store.transition_to_reveal(id, soon()).await.unwrap();
        store
            .transition_to_scoring(id, soon(), Scoring::default())
            .await
            .unwrap();

        let err = store
            .transition_to_question(id, soon(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoundError::NoEligibleQuestions(RoundType::MultipleChoice)
        ));
    }

    #[tokio::test]
    async fn recovery_lock_is_exclusive_until_released() {
        let store = InMemoryRoundStore::new();
        let id = GameStateId::new();
        assert!(store.try_acquire_game_lock(id).await.unwrap());
        assert!(!store.try_acquire_game_lock(id).await.unwrap());
        store.release_game_lock(id).await.unwrap();
        assert!(store.try_acquire_game_lock(id).await.unwrap());
    }

    #[tokio::test]
    async fn finished_games_are_not_listed_as_active() {
        let store = InMemoryRoundStore::new();
        let game = store
            .create_game("WXYZ", &["ada", "bob"], soon())
            .await
            .unwrap();
        assert_eq!(store.list_active_games().await.unwrap().len(), 1);

        let players = store.list_players_in_room(game.room_id).await.unwrap();
        assert_eq!(players.len(), 2);

        store.inner.lock().await.games.get_mut(&game.game_state_id).unwrap().finished = true;
        assert!(store.list_active_games().await.unwrap().is_empty());
    }
}
