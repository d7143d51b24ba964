//! Query a Pinecone index with a constant probe vector.
//!
//! ```sh
//! PINECONE_API_KEY=... cargo run -p gateway-index --example query_demo
//! ```

use index::{PineconeConfig, PineconeIndex, QueryRequest, VectorIndex};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("PINECONE_API_KEY")?;
    let index_name =
        std::env::var("PINECONE_INDEX").unwrap_or_else(|_| index::DEFAULT_INDEX_NAME.to_string());

    let index = PineconeIndex::new(PineconeConfig {
        api_key,
        index_name,
        index_host: std::env::var("PINECONE_HOST").ok(),
        ..Default::default()
    })?;

    // Any vector of the index's dimension works as a probe.
    let probe = vec![0.01f32; 1536];
    let matches = index.query(QueryRequest::new(&probe, 10)).await?;

    println!("{} matches from {}", matches.len(), index.index_name());
    for (rank, m) in matches.iter().enumerate() {
        println!("{:>2}. {} score={:?}", rank + 1, m.id, m.score);
    }
    Ok(())
}
