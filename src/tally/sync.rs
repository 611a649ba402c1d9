//! Sharing a set of score sheets between reviewers.
//!
//! A shared session is a snapshot of all the score sheets and judges, stored
//! as `{token}.json` in the sync directory. Joining a session replaces the
//! current score sheets with the snapshot: nothing is merged.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::tally::*;

/// Tokens shorter than this are rejected without looking them up.
pub const MIN_TOKEN_LEN: usize = 5;
/// Length of the tokens handed out by [`create_session`].
pub const TOKEN_LEN: usize = 8;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Judge {
    pub name: String,
    pub username: String,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SyncSnapshot {
    pub candidates: Vec<JsScoreRecord>,
    pub judges: Vec<Judge>,
    pub version: u64,
}

/// The judges that appear in the score sheets, in order of first appearance.
pub fn judges_from_records(records: &[ScoreRecord]) -> Vec<Judge> {
    let mut res: Vec<Judge> = Vec::new();
    for r in records.iter() {
        if r.judge.is_empty() || res.iter().any(|j| j.username == r.judge) {
            continue;
        }
        res.push(Judge {
            name: r.judge.clone(),
            username: r.judge.clone(),
        });
    }
    res
}

fn validate_token(token: &str) -> TallyResult<String> {
    let t = token.trim();
    ensure!(
        t.chars().count() >= MIN_TOKEN_LEN && t.chars().all(|c| c.is_ascii_alphanumeric()),
        InvalidSyncTokenSnafu {
            token,
            min: MIN_TOKEN_LEN
        }
    );
    Ok(t.to_ascii_uppercase())
}

/// Stores a snapshot of the score sheets and returns the token to share.
pub fn create_session(
    records: &[ScoreRecord],
    judges: &[Judge],
    version: u64,
    sync_dir: &Path,
) -> TallyResult<String> {
    let snapshot = SyncSnapshot {
        candidates: records.iter().map(JsScoreRecord::from_record).collect(),
        judges: judges.to_vec(),
        version,
    };
    let payload = serde_json::to_string_pretty(&snapshot).context(ParsingJsonSnafu {})?;
    let token: String = sha256::digest(payload.as_str())
        .chars()
        .take(TOKEN_LEN)
        .collect::<String>()
        .to_ascii_uppercase();

    let dir = sync_dir.display().to_string();
    fs::create_dir_all(sync_dir).context(WritingFileSnafu { path: dir })?;
    let path = sync_dir.join(format!("{}.json", token));
    let p = path.display().to_string();
    fs::write(&path, payload).context(WritingFileSnafu { path: p })?;
    info!(
        "Shared {} score sheets from {} judges under token {}",
        records.len(),
        judges.len(),
        token
    );
    Ok(token)
}

/// Reads the score sheets shared under `token`.
pub fn join_session(token: &str, sync_dir: &Path) -> BTallyResult<Vec<ScoreRecord>> {
    let t = validate_token(token)?;
    let path = sync_dir.join(format!("{}.json", t));
    if !path.exists() {
        return Err(Box::new(TallyError::UnknownSyncToken { token: t }));
    }
    let p = path.display().to_string();
    let contents = fs::read_to_string(&path).context(OpeningJsonSnafu { path: p })?;
    let js: JSValue = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    if let Some(v) = js.get("version") {
        debug!("join_session: {} version {}", t, v);
    }
    let parsed: Vec<ParsedRecord> = io_json::parse_records_js(js)?
        .iter()
        .enumerate()
        .map(|(idx, r)| r.to_parsed(format!("{}-{:08}", t, idx + 1)))
        .collect();
    let records = validate_records(&parsed);
    info!("Joined session {}: {} score sheets", t, records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(judge: &str, group: &str, total: f64) -> ScoreRecord {
        let mut r = ScoreRecord {
            judge: judge.to_string(),
            group_number: group.to_string(),
            group_index: "1".to_string(),
            name: "Alice".to_string(),
            selected_stages: vec!["导入".to_string()],
            total_score: total,
            feedback: Some("Clear".to_string()),
            ..Default::default()
        };
        r.scores.insert(Criterion::C2_1, 7.5);
        r
    }

    #[test]
    fn short_tokens_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        for token in ["", "AB12", "ABC 12", "AB-12"] {
            assert!(matches!(
                join_session(token, dir.path()).map_err(|e| *e),
                Err(TallyError::InvalidSyncToken { min: 5, .. })
            ));
        }
    }

    #[test]
    fn unknown_token() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            join_session("ABCDE", dir.path()).map_err(|e| *e),
            Err(TallyError::UnknownSyncToken { .. })
        ));
    }

    #[test]
    fn judges_are_unique() {
        let records = vec![sheet("zhang", "1", 80.0), sheet("li", "1", 90.0), sheet("zhang", "2", 70.0)];
        let judges = judges_from_records(&records);
        let names: Vec<&str> = judges.iter().map(|j| j.username.as_str()).collect();
        assert_eq!(names, vec!["zhang", "li"]);
    }

    #[test]
    fn create_then_join() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![sheet("zhang", "1", 80.0), sheet("li", "2", 90.5)];
        let judges = judges_from_records(&records);
        let token = create_session(&records, &judges, 42, dir.path()).unwrap();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

        let joined = join_session(&token.to_lowercase(), dir.path()).unwrap();
        assert_eq!(joined, records);

        // Same snapshot, same token.
        let again = create_session(&records, &judges, 42, dir.path()).unwrap();
        assert_eq!(again, token);
    }
}
