pub mod owners_db_operations;
