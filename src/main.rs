#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fitness_center::run().await
}
