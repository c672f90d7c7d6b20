//! A small application graph: a transient logger, a singleton database that
//! captures one logger, and a transient service built on both.

use fibre_di::Container;
use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

trait Logger: Send + Sync {
  fn log(&self, message: &str);
}

struct ConsoleLogger {
  id: usize,
}

impl Logger for ConsoleLogger {
  fn log(&self, message: &str) {
    println!("[logger #{}] {}", self.id, message);
  }
}

struct Database {
  logger: Arc<dyn Logger>,
}

impl Database {
  fn query(&self, sql: &str) -> usize {
    self.logger.log(&format!("query: {sql}"));
    sql.len()
  }
}

struct ReportService {
  db: Arc<Database>,
  logger: Arc<dyn Logger>,
}

static LOGGERS: AtomicUsize = AtomicUsize::new(0);

fn main() {
  let container = Container::new();

  // Registration order is free; the graph is only examined on resolution.
  container
    .add_transient(|(db, logger): (Arc<Database>, Arc<dyn Logger>)| ReportService { db, logger })
    .expect("registration failed");
  container
    .add_singleton(|(logger,): (Arc<dyn Logger>,)| Database { logger })
    .expect("registration failed");
  container
    .add_transient_trait::<dyn Logger, _>(|()| {
      Arc::new(ConsoleLogger {
        id: LOGGERS.fetch_add(1, Ordering::SeqCst),
      })
    })
    .expect("registration failed");

  container.validate().expect("the graph is complete");

  let first = container.resolve::<ReportService>().expect("report service");
  let second = container.resolve::<ReportService>().expect("report service");

  first.logger.log("generating report");
  let rows = first.db.query("SELECT * FROM sales");
  second.logger.log(&format!("{rows} rows"));

  // One database for everyone, a fresh logger per service.
  assert!(Arc::ptr_eq(&first.db, &second.db));
  assert!(!Arc::ptr_eq(&first.logger, &second.logger));
  assert_eq!(LOGGERS.load(Ordering::SeqCst), 3);
}
