#![allow(dead_code)]

use async_trait::async_trait;
use myorm::{
    Client, Config, Driver, Entity, ExecResult, Link, OrmResult, Pool, PoolConfig, Row, Value,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const TABLE_NAME: &str = "person";

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Audit {
    #[orm(column = "add_time")]
    pub add_time: String,
    #[orm(column = "edit_time")]
    pub edit_time: String,
}

#[derive(Debug, Default, Clone, PartialEq, Entity)]
pub struct Person {
    #[orm(column = "id")]
    pub id: i64,
    #[orm(embed)]
    pub audit: Audit,
    #[orm(column = "name")]
    pub name: String,
    #[orm(column = "age")]
    pub age: i32,
}

pub fn person(id: i64, name: &str, age: i32) -> Person {
    Person {
        id,
        audit: Audit {
            add_time: "2020-01-01 00:00:00".to_string(),
            edit_time: "2020-01-01 00:00:00".to_string(),
        },
        name: name.to_string(),
        age,
    }
}

pub fn person_row(p: &Person) -> Vec<Value> {
    myorm::mapper::insert_column_values(p)
}

/// Rows sharing one column list.
pub fn rows(columns: &[&str], values: Vec<Vec<Value>>) -> Vec<Row> {
    let columns: Arc<[String]> = columns
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .into();
    values
        .into_iter()
        .map(|v| Row::new(Arc::clone(&columns), v))
        .collect()
}

pub fn person_rows(people: &[Person]) -> Vec<Row> {
    rows(
        &myorm::mapper::column_names::<Person>(),
        people.iter().map(person_row).collect(),
    )
}

#[derive(Default)]
pub struct State {
    pub statements: Vec<(String, Vec<Value>)>,
    pub exec_results: VecDeque<OrmResult<ExecResult>>,
    pub query_results: VecDeque<OrmResult<Vec<Row>>>,
    pub tx_events: Vec<&'static str>,
    pub links_opened: usize,
    pub links_closed: usize,
    pub links_dropped: usize,
}

/// Shared script behind every link it opens.
///
/// Statements without a queued response succeed: writes affect one row,
/// reads return no rows.
#[derive(Clone, Default)]
pub struct Script {
    state: Arc<Mutex<State>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn push_exec(&self, result: OrmResult<ExecResult>) -> &Self {
        self.state().exec_results.push_back(result);
        self
    }

    pub fn push_affected(&self, rows_affected: u64, last_insert_id: Option<i64>) -> &Self {
        self.push_exec(Ok(ExecResult {
            last_insert_id,
            rows_affected,
        }))
    }

    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        self.state().query_results.push_back(Ok(rows));
        self
    }

    pub fn push_query_error(&self, err: myorm::OrmError) -> &Self {
        self.state().query_results.push_back(Err(err));
        self
    }

    pub fn statements(&self) -> Vec<(String, Vec<Value>)> {
        self.state().statements.clone()
    }

    pub fn sqls(&self) -> Vec<String> {
        self.statements().into_iter().map(|(sql, _)| sql).collect()
    }

    pub fn last(&self) -> (String, Vec<Value>) {
        self.state().statements.last().cloned().unwrap()
    }

    pub fn link(&self) -> Box<dyn Link> {
        self.state().links_opened += 1;
        Box::new(FakeLink {
            state: Arc::clone(&self.state),
        })
    }

    pub fn client(&self) -> Client {
        Client::new(self.link())
    }

    pub fn pool(&self, max_conns: usize) -> Pool {
        let script = self.clone();
        Pool::new(
            PoolConfig::new(max_conns, Duration::from_secs(60)),
            move || {
                let script = script.clone();
                async move { Ok::<_, myorm::OrmError>(script.client()) }
            },
        )
        .unwrap()
    }
}

pub struct FakeLink {
    state: Arc<Mutex<State>>,
}

impl FakeLink {
    fn record(&self, sql: &str, args: &[Value]) -> MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.statements.push((sql.to_string(), args.to_vec()));
        state
    }
}

#[async_trait]
impl Link for FakeLink {
    async fn execute(&mut self, sql: &str, args: &[Value]) -> OrmResult<ExecResult> {
        let mut state = self.record(sql, args);
        state.exec_results.pop_front().unwrap_or(Ok(ExecResult {
            last_insert_id: None,
            rows_affected: 1,
        }))
    }

    async fn query(&mut self, sql: &str, args: &[Value]) -> OrmResult<Vec<Row>> {
        let mut state = self.record(sql, args);
        state.query_results.pop_front().unwrap_or(Ok(Vec::new()))
    }

    async fn begin(&mut self) -> OrmResult<()> {
        self.state.lock().unwrap().tx_events.push("begin");
        Ok(())
    }

    async fn commit(&mut self) -> OrmResult<()> {
        self.state.lock().unwrap().tx_events.push("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> OrmResult<()> {
        self.state.lock().unwrap().tx_events.push("rollback");
        Ok(())
    }

    async fn close(&mut self) -> OrmResult<()> {
        self.state.lock().unwrap().links_closed += 1;
        Ok(())
    }
}

impl Drop for FakeLink {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.links_dropped += 1;
        }
    }
}

/// Driver opening links from a [`Script`].
pub struct FakeDriver {
    pub script: Script,
}

#[async_trait]
impl Driver for FakeDriver {
    async fn connect(&self, _config: &Config) -> OrmResult<Box<dyn Link>> {
        Ok(self.script.link())
    }
}
