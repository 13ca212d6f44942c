//! Analyze one review and print the JSON record.
//!
//! ```text
//! GIGACHAT_CREDENTIALS=... SENTIMENT_ENDPOINT=http://localhost:8080/predict \
//!     cargo run --example analyze_review -- "Доставка была ужасно медленной"
//! ```
//!
//! Set `REVIEW_INSIGHTS_CONFIG` to read a TOML file instead of the environment.

use review_insights::{AnalyzerConfig, ReviewAnalyzer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let review = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if review.is_empty() {
        eprintln!("usage: analyze_review <review text>");
        std::process::exit(2);
    }

    let config = match std::env::var("REVIEW_INSIGHTS_CONFIG") {
        Ok(path) => AnalyzerConfig::from_file(path)?,
        Err(_) => AnalyzerConfig::from_env()?,
    };
    let analyzer = ReviewAnalyzer::from_config(&config)?;

    match analyzer.analyze_review(&review).await {
        Ok(result) => {
            println!("{}", result.to_json_pretty()?);
            Ok(())
        }
        Err(e) => {
            eprintln!("analysis failed: {}", e);
            std::process::exit(1);
        }
    }
}
