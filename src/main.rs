#[actix_web::main]
async fn main() -> std::io::Result<()> {
    facture_dispatch_server::run().await
}
