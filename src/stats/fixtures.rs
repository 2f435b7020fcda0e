//! Builder for small in-memory league graphs used in tests.

use crate::source::memory::{GraphSnapshot, MemoryGraph};
use serde_json::json;
use std::collections::HashSet;

pub(crate) struct LeagueBuilder {
    snapshot: GraphSnapshot,
    ids: HashSet<String>,
    season_id: Option<String>,
    next_event: usize,
}

impl LeagueBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: GraphSnapshot::default(),
            ids: HashSet::new(),
            season_id: None,
            next_event: 0,
        }
    }

    fn ensure_node(&mut self, id: &str, label: &str, properties: serde_json::Value) {
        if self.ids.insert(id.to_string()) {
            self.snapshot.add_node(id, label, properties);
        }
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_event += 1;
        format!("{}:{}", prefix, self.next_event)
    }

    /// Select (creating if needed) the season that later games belong to.
    pub fn season(&mut self, competition: &str, season: &str) -> &mut Self {
        let comp_id = format!("competition:{}", competition);
        let season_id = format!("season:{}:{}", competition, season);
        self.ensure_node(&comp_id, "Competition", json!({ "name": competition }));
        if self.ids.insert(season_id.clone()) {
            self.snapshot
                .add_node(&season_id, "Season", json!({ "name": season }))
                .add_rel("PART_OF", &season_id, &comp_id, json!({}));
        }
        self.season_id = Some(season_id);
        self
    }

    pub fn team(&mut self, name: &str) -> &mut Self {
        let short: String = name.chars().filter(|c| c.is_uppercase()).collect();
        self.ensure_node(
            &format!("team:{}", name),
            "Team",
            json!({ "name": name, "shortName": short }),
        );
        self
    }

    /// Add a player as `"First Last"` on `team`.
    pub fn player(&mut self, name: &str, team: &str) -> &mut Self {
        let (first, last) = name.split_once(' ').unwrap_or((name, ""));
        let id = format!("player:{}", name);
        self.team(team);
        if self.ids.insert(id.clone()) {
            self.snapshot
                .add_node(&id, "Player", json!({ "firstName": first, "lastName": last }))
                .add_rel("PLAYS_FOR", &id, &format!("team:{}", team), json!({}));
        }
        self
    }

    /// Add a game in the current season; returns its id.
    ///
    /// Results follow the final score; `overtime` turns a one-goal margin
    /// into OTW/OTL with 2/1 points.
    pub fn game(
        &mut self,
        date: &str,
        home: &str,
        away: &str,
        score: (u64, u64),
        overtime: bool,
    ) -> String {
        let season_id = self.season_id.clone().expect("call season() first");
        self.team(home).team(away);
        let id = self.next_id("game");
        self.snapshot
            .add_node(
                &id,
                "Game",
                json!({
                    "date": date,
                    "homeTeam": home,
                    "awayTeam": away,
                    "score": format!("{}-{}", score.0, score.1),
                    "spectators": 5000 + 100 * self.next_event,
                }),
            )
            .add_rel("PART_OF", &id, &season_id, json!({}));

        let (home_result, away_result) = outcome(score, overtime);
        for (team, (result, points), gf, ga, is_home) in [
            (home, home_result, score.0, score.1, true),
            (away, away_result, score.1, score.0, false),
        ] {
            self.snapshot.add_rel(
                "PLAYED",
                &format!("team:{}", team),
                &id,
                json!({
                    "result": result,
                    "goalsFor": gf,
                    "goalsAgainst": ga,
                    "points": points,
                    "home": is_home,
                }),
            );
        }
        id
    }

    pub fn goal(&mut self, game: &str, scorer: &str, assists: &[&str]) -> &mut Self {
        let id = self.next_id("goal");
        self.snapshot
            .add_node(&id, "Goal", json!({}))
            .add_rel("IN_GAME", &id, game, json!({}))
            .add_rel("SCORED", &format!("player:{}", scorer), &id, json!({}));
        for assist in assists {
            self.snapshot
                .add_rel("ASSISTED_IN", &format!("player:{}", assist), &id, json!({}));
        }
        self
    }

    pub fn goals(&mut self, game: &str, scorer: &str, count: usize) -> &mut Self {
        for _ in 0..count {
            self.goal(game, scorer, &[]);
        }
        self
    }

    pub fn penalty(&mut self, game: &str, player: &str, minutes: u64) -> &mut Self {
        let id = self.next_id("penalty");
        self.snapshot
            .add_node(
                &id,
                "Penalty",
                json!({ "description": "Hooking", "minutes": minutes }),
            )
            .add_rel("IN_GAME", &id, game, json!({}))
            .add_rel("COMMITTED", &format!("player:{}", player), &id, json!({}));
        self
    }

    pub fn build(&mut self) -> MemoryGraph {
        MemoryGraph::from_snapshot(std::mem::take(&mut self.snapshot), "fixture")
            .expect("fixture graph is consistent")
    }
}

fn outcome(score: (u64, u64), overtime: bool) -> ((&'static str, u64), (&'static str, u64)) {
    let (home, away) = score;
    match (home.cmp(&away), overtime) {
        (std::cmp::Ordering::Equal, _) => (("T", 1), ("T", 1)),
        (std::cmp::Ordering::Greater, false) => (("W", 3), ("L", 0)),
        (std::cmp::Ordering::Less, false) => (("L", 0), ("W", 3)),
        (std::cmp::Ordering::Greater, true) => (("OTW", 2), ("OTL", 1)),
        (std::cmp::Ordering::Less, true) => (("OTL", 1), ("OTW", 2)),
    }
}
