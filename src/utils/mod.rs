pub mod html;
pub mod http_client;
pub mod llm_log;
pub mod salary;
