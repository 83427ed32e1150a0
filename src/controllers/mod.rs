pub mod items_controller;
