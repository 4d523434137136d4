mod config_tests;
mod engine_tests;
mod function_handler_tests;
mod http_server_tests;
mod stdio_tests;
