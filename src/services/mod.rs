pub mod conversion_builder;
pub mod listing;
pub mod redirect_service;
pub mod resolver;
pub mod tracking;
