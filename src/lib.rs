pub mod app;
pub mod config;
pub mod demo_seeder;
pub mod error;
pub mod listing;
pub mod store;
pub mod models {
    pub mod comment;
    pub mod funding;
    pub mod lenient;
    pub mod project;
    pub mod record;
    pub mod tags;
}
pub mod auth {
    pub mod demo_auth;
    pub mod middleware;
    pub mod models;
    pub mod provider;
}
pub mod api {
    pub mod dashboard;
    pub mod errors;
    pub mod funding;
    pub mod listings;
    pub mod projects;
}
