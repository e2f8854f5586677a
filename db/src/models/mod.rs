pub mod run;

pub use run::Entity as Runs;
