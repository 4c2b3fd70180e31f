//! Bucket lookup and ARN helpers.

/// Suffix appended to a bucket name to name its backup bucket.
pub const BACKUP_SUFFIX: &str = "-backup";

/// Finds a bucket by exact name.
pub fn find_bucket<'a, S: AsRef<str>>(buckets: &'a [S], name: &str) -> Option<&'a str> {
    buckets
        .iter()
        .map(AsRef::as_ref)
        .find(|bucket| *bucket == name)
}

/// Finds the last bucket whose name contains `fragment`.
///
/// CloudTrail generates bucket names with a random suffix, so the lookup is a
/// substring match. When several buckets match, the last one listed wins.
pub fn find_bucket_containing<'a, S: AsRef<str>>(
    buckets: &'a [S],
    fragment: &str,
) -> Option<&'a str> {
    buckets
        .iter()
        .map(AsRef::as_ref)
        .rfind(|bucket| bucket.contains(fragment))
}

/// Returns the backup bucket name for `bucket`.
pub fn backup_bucket_name(bucket: &str) -> String {
    format!("{}{}", bucket, BACKUP_SUFFIX)
}

/// Returns the S3 ARN of a bucket.
pub fn bucket_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{}", bucket)
}

/// Returns the ARN of an IAM role in an account.
pub fn role_arn(account_id: &str, role_name: &str) -> String {
    format!("arn:aws:iam::{}:role/{}", account_id, role_name)
}
