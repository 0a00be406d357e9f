pub mod statement_controllers;
