pub mod browser_collector;
pub mod card_validator;
pub mod in_memory;
pub mod simulated;
