mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use instructor_intake::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
