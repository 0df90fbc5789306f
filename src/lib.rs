pub mod calc_types;
pub mod calc_lexer;
pub mod calc_config;
pub mod calc_constants;
pub mod calc_context;
pub mod calc_parser;
pub mod calc_directives;
pub mod calc_loader;
pub mod calc_session;
