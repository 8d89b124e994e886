/*!
 * MinIO quickstart
 *
 * Uploads, lists, presigns and cleans up a few objects on a local MinIO.
 *
 * Start MinIO and create the bucket first:
 *
 *   docker run -p 9000:9000 minio/minio server /data
 *   mc mb local/s3bridge-demo
 *
 * Then: cargo run --example minio_quickstart
 */

use s3bridge::{init_logging, LogConfig, RequestContext, S3Client, S3Config, UploadOptions};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&LogConfig::verbose())?;

    let config = S3Config::minio(
        "http://localhost:9000",
        "minioadmin",
        "minioadmin",
        "s3bridge-demo",
    );
    let client = S3Client::connect(config).await?;
    println!("{}\n", client.config().report());

    let ctx = RequestContext::new().with_timeout(Duration::from_secs(30));
    client.check_bucket(&ctx).await?;

    let options = UploadOptions::new()
        .with_content_type("text/plain")
        .with_metadata("source", "minio_quickstart");
    for i in 0..3 {
        let key = format!("demo/note-{}.txt", i);
        client
            .upload(&ctx, &key, format!("note number {}\n", i), Some(&options))
            .await?;
        println!("uploaded {}", key);
    }

    for object in client.list(&ctx, "demo/").await? {
        println!("{:<24} {:>6} bytes", object.key, object.size);
    }

    let url = client
        .generate_presigned_url(&ctx, "demo/note-0.txt", Duration::from_secs(15 * 60))
        .await?;
    println!("\npresigned (15 min): {}\n", url);

    let body = client.download(&ctx, "demo/note-1.txt").await?;
    print!("note-1 says: {}", String::from_utf8_lossy(&body));

    let keys: Vec<String> = (0..3).map(|i| format!("demo/note-{}.txt", i)).collect();
    client.delete_multiple(&ctx, &keys).await?;
    println!("cleaned up {} objects", keys.len());

    Ok(())
}
