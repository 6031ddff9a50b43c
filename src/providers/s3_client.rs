use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use log::{debug, info};

use crate::config::StoreConfig;

pub type S3Result<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Region used to ask a bucket where it lives
pub const BOOTSTRAP_REGION: &str = "us-east-1";

const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";

fn build_client(shared: &SdkConfig, config: &StoreConfig, region: &str) -> Client {
    let mut builder = S3ConfigBuilder::from(shared).region(Region::new(region.to_string()));

    if let Some(endpoint_url) = config.endpoint_url.as_deref() {
        builder = builder.endpoint_url(endpoint_url);
    }

    if config.force_path_style {
        builder = builder.force_path_style(true);
    }

    Client::from_conf(builder.build())
}

/// Create a client bound to the bucket's region.
///
/// Static credentials from the config win over the default provider chain.
/// Without an explicit region a custom endpoint gets `us-east-1`, AWS buckets
/// are asked for their region first.
pub async fn create_s3_client(config: &StoreConfig) -> S3Result<Client> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(
        config
            .region
            .clone()
            .unwrap_or_else(|| BOOTSTRAP_REGION.to_string()),
    ));
    if let Some(credentials) = config.credentials() {
        loader = loader.credentials_provider(credentials);
    }
    let shared = loader.load().await;

    let region = match (&config.region, &config.endpoint_url) {
        (Some(region), _) => region.clone(),
        (None, Some(_)) => BOOTSTRAP_REGION.to_string(),
        (None, None) => {
            let bootstrap = build_client(&shared, config, BOOTSTRAP_REGION);
            let region = bucket_region(&bootstrap, &config.bucket).await?;
            info!("bucket_region: bucket={} region={}", config.bucket, region);
            region
        }
    };

    debug!(
        "create_s3_client: bucket={} region={} endpoint={:?}",
        config.bucket, region, config.endpoint_url
    );
    Ok(build_client(&shared, config, &region))
}

/// Look the bucket's region up with a HeadBucket request.
///
/// A bucket in another region answers with a redirect, which still carries the
/// region header.
pub async fn bucket_region(client: &Client, bucket: &str) -> S3Result<String> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(output) => output
            .bucket_region()
            .map(str::to_string)
            .ok_or_else(|| format!("bucket {:?}: no region in response", bucket).into()),
        Err(err) => {
            let header = err
                .raw_response()
                .and_then(|response| response.headers().get(BUCKET_REGION_HEADER))
                .map(str::to_string);
            match header {
                Some(region) => Ok(region),
                None => Err(format!(
                    "bucket {:?}: region lookup failed: {}",
                    bucket,
                    DisplayErrorContext(&err)
                )
                .into()),
            }
        }
    }
}
