pub mod audit;
pub mod bot;
pub mod cart;
pub mod config;
pub mod db;
pub mod detector;
pub mod dto;
pub mod entity;
pub mod error;
pub mod ingress;
pub mod middleware;
pub mod models;
pub mod recognize;
pub mod render;
pub mod response;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod storage;
pub mod vector;
