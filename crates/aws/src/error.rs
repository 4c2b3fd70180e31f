//! AWS SDK error mapping.
//!
//! Maps SDK errors to `ServiceError` from `cloudkit_core`.

use std::error::Error;
use std::fmt::Debug;

use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemError;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::operation::get_item::GetItemError;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::query::QueryError;
use aws_sdk_s3::operation::get_object::GetObjectError;
use cloudkit_core::ServiceError;

/// Map any SDK error to ServiceError, using the error code when there is one.
pub fn map_sdk_error<E, R>(err: SdkError<E, R>, operation: &str) -> ServiceError
where
    E: ProvideErrorMetadata + Error + 'static,
    R: Debug,
{
    if matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_)
    ) {
        return ServiceError::ConnectionFailed(format!(
            "{} failed: {}",
            operation,
            DisplayErrorContext(&err)
        ));
    }

    match err.code() {
        Some("ThrottlingException")
        | Some("ProvisionedThroughputExceededException")
        | Some("RequestLimitExceeded") => {
            ServiceError::RequestFailed(format!("{}: throughput exceeded, please retry", operation))
        }
        Some("IncorrectInstanceState") => ServiceError::InvalidState(format!(
            "{}: {}",
            operation,
            err.message().unwrap_or("incorrect instance state")
        )),
        Some(code) => ServiceError::RequestFailed(format!(
            "{} failed: {}: {}",
            operation,
            code,
            err.message().unwrap_or_default()
        )),
        None => ServiceError::RequestFailed(format!(
            "{} failed: {}",
            operation,
            DisplayErrorContext(&err)
        )),
    }
}

/// Map a GetObject SDK error to ServiceError.
pub fn map_get_object_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetObjectError, R>,
    bucket: &str,
    key: &str,
) -> ServiceError {
    match err.into_service_error() {
        GetObjectError::NoSuchKey(_) => ServiceError::NotFound {
            entity_type: "Object",
            id: format!("{}/{}", bucket, key),
        },
        GetObjectError::InvalidObjectState(_) => {
            ServiceError::InvalidState(format!("object {}/{} is archived", bucket, key))
        }
        err => ServiceError::RequestFailed(format!("GetObject failed: {}", DisplayErrorContext(&err))),
    }
}

/// Map a GetItem SDK error to ServiceError.
pub fn map_get_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<GetItemError, R>,
    entity_type: &'static str,
    id: impl Into<String>,
) -> ServiceError {
    match err.into_service_error() {
        GetItemError::ResourceNotFoundException(_) => ServiceError::NotFound {
            entity_type,
            id: id.into(),
        },
        GetItemError::ProvisionedThroughputExceededException(_) => {
            ServiceError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        GetItemError::RequestLimitExceeded(_) => {
            ServiceError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        GetItemError::InternalServerError(_) => {
            ServiceError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => ServiceError::RequestFailed(format!("GetItem failed: {:?}", err)),
    }
}

/// Map a BatchGetItem SDK error to ServiceError.
pub fn map_batch_get_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<BatchGetItemError, R>,
) -> ServiceError {
    match err.into_service_error() {
        BatchGetItemError::ResourceNotFoundException(_) => {
            ServiceError::RequestFailed("Table not found".to_string())
        }
        BatchGetItemError::ProvisionedThroughputExceededException(_) => {
            ServiceError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        BatchGetItemError::RequestLimitExceeded(_) => {
            ServiceError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        err => ServiceError::RequestFailed(format!("BatchGetItem failed: {:?}", err)),
    }
}

/// Map a Query SDK error to ServiceError.
pub fn map_query_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<QueryError, R>,
) -> ServiceError {
    match err.into_service_error() {
        QueryError::ResourceNotFoundException(_) => {
            ServiceError::RequestFailed("Table or index not found".to_string())
        }
        QueryError::ProvisionedThroughputExceededException(_) => {
            ServiceError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        QueryError::RequestLimitExceeded(_) => {
            ServiceError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        QueryError::InternalServerError(_) => {
            ServiceError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => ServiceError::RequestFailed(format!("Query failed: {:?}", err)),
    }
}

/// Map a PutItem SDK error to ServiceError.
pub fn map_put_item_error<R: Debug + Send + Sync + 'static>(
    err: SdkError<PutItemError, R>,
    entity_type: &'static str,
    id: impl Into<String>,
) -> ServiceError {
    match err.into_service_error() {
        PutItemError::ConditionalCheckFailedException(_) => ServiceError::AlreadyExists {
            entity_type,
            id: id.into(),
        },
        PutItemError::ResourceNotFoundException(_) => {
            ServiceError::RequestFailed("Table not found".to_string())
        }
        PutItemError::ProvisionedThroughputExceededException(_) => {
            ServiceError::RequestFailed("Throughput exceeded, please retry".to_string())
        }
        PutItemError::RequestLimitExceeded(_) => {
            ServiceError::RequestFailed("Request limit exceeded, please retry".to_string())
        }
        PutItemError::ItemCollectionSizeLimitExceededException(_) => {
            ServiceError::RequestFailed("Item collection size limit exceeded".to_string())
        }
        PutItemError::TransactionConflictException(_) => {
            ServiceError::RequestFailed("Transaction conflict, please retry".to_string())
        }
        PutItemError::InternalServerError(_) => {
            ServiceError::RequestFailed("DynamoDB internal server error".to_string())
        }
        err => ServiceError::RequestFailed(format!("PutItem failed: {:?}", err)),
    }
}

/// Returns true when a DescribeTable error means the table does not exist.
pub fn is_table_missing<R: Debug>(err: &SdkError<DescribeTableError, R>) -> bool {
    matches!(
        err.as_service_error(),
        Some(DescribeTableError::ResourceNotFoundException(_))
    )
}

/// Map a generic connection/config error to ServiceError.
pub fn map_connection_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::ConnectionFailed(err.to_string())
}

/// Map a request builder error (missing required field) to ServiceError.
pub fn map_build_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::InvalidData(format!("invalid request: {}", err))
}
