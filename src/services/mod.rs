pub mod notifier;
pub mod sheet_publisher;

pub use notifier::{LogNotifier, Notifier, SlackNotifier};
pub use sheet_publisher::{CsvSheetPublisher, SheetPublisher};
