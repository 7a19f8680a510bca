use futures::{StreamExt, stream, stream::BoxStream};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tabula::{Compiled, Engine, EngineType, QueryResult, RowLabeled, RowsAffected, Value};

/// Engine that records every statement and replies with scripted results.
///
/// Each `run` consumes the next scripted reply, or reports zero affected rows
/// when none is left.
pub struct RecordingEngine {
    engine_type: EngineType,
    executed: Mutex<Vec<Compiled>>,
    replies: Mutex<VecDeque<Result<Vec<QueryResult>, String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingEngine {
    pub fn new(engine_type: EngineType) -> Arc<Self> {
        Arc::new(Self {
            engine_type,
            executed: Default::default(),
            replies: Default::default(),
        })
    }

    /// Queue the results of the next unanswered statement.
    pub fn reply(&self, results: impl IntoIterator<Item = QueryResult>) -> &Self {
        lock(&self.replies).push_back(Ok(results.into_iter().collect()));
        self
    }

    /// Queue rows with the given labels.
    pub fn reply_rows<const N: usize>(&self, labels: [&str; N], rows: Vec<[Value; N]>) -> &Self {
        let labels: Arc<[String]> = labels.iter().map(|v| v.to_string()).collect();
        self.reply(rows.into_iter().map(|values| {
            QueryResult::Row(RowLabeled::new(labels.clone(), Box::new(values)))
        }))
    }

    pub fn reply_affected(&self, rows_affected: u64) -> &Self {
        self.reply([QueryResult::Affected(RowsAffected {
            rows_affected,
            last_affected_id: None,
        })])
    }

    /// Make the next unanswered statement fail.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        lock(&self.replies).push_back(Err(message.into()));
        self
    }

    pub fn executed(&self) -> Vec<Compiled> {
        lock(&self.executed).clone()
    }

    /// Text of every statement executed so far.
    pub fn sql(&self) -> Vec<String> {
        lock(&self.executed).iter().map(|v| v.sql.clone()).collect()
    }

    pub fn clear(&self) {
        lock(&self.executed).clear();
        lock(&self.replies).clear();
    }
}

impl Engine for RecordingEngine {
    fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    fn run(&self, query: Compiled) -> BoxStream<'_, anyhow::Result<QueryResult>> {
        log::trace!("Recorded: {}", query);
        lock(&self.executed).push(query);
        let reply = lock(&self.replies).pop_front().unwrap_or_else(|| {
            Ok(vec![QueryResult::Affected(RowsAffected::default())])
        });
        match reply {
            Ok(results) => stream::iter(results.into_iter().map(Ok)).boxed(),
            Err(message) => stream::once(async move { Err(anyhow::anyhow!(message)) }).boxed(),
        }
    }
}
