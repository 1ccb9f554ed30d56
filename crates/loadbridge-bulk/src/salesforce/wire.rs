//! Bulk API request and response documents

use crate::client::BulkClientError;
use crate::payload::ContentType;
use quick_xml::escape::escape;
use serde::Deserialize;

pub(crate) const ASYNC_API_NAMESPACE: &str = "http://www.force.com/2009/06/asyncapi/dataload";

pub(crate) const XML_MIME_TYPE: &str = "application/xml; charset=UTF-8";

/// `jobInfo` response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobInfo {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
}

/// `batchInfo` response (XML for CSV jobs, JSON for JSON jobs)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchInfo {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub state_message: Option<String>,
    #[serde(default)]
    pub number_records_processed: u64,
    #[serde(default)]
    pub number_records_failed: u64,
}

/// `error` document returned with non-2xx responses
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiFault {
    pub exception_code: String,
    #[serde(default)]
    pub exception_message: String,
}

pub(crate) fn create_job_request(object: &str, content_type: ContentType) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><jobInfo xmlns="{}"><operation>insert</operation><object>{}</object><contentType>{}</contentType></jobInfo>"#,
        ASYNC_API_NAMESPACE,
        escape(object),
        content_type.as_str()
    )
}

pub(crate) fn close_job_request() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><jobInfo xmlns="{}"><state>Closed</state></jobInfo>"#,
        ASYNC_API_NAMESPACE
    )
}

pub(crate) fn parse_job_info(body: &str) -> Result<JobInfo, BulkClientError> {
    quick_xml::de::from_str(body)
        .map_err(|e| BulkClientError::InvalidResponse(format!("unreadable jobInfo: {}", e)))
}

pub(crate) fn parse_batch_info(body: &str, content_type: ContentType) -> Result<BatchInfo, BulkClientError> {
    let parsed = match content_type {
        ContentType::Csv => quick_xml::de::from_str(body).map_err(|e| e.to_string()),
        ContentType::Json => serde_json::from_str(body).map_err(|e| e.to_string()),
    };
    parsed.map_err(|e| BulkClientError::InvalidResponse(format!("unreadable batchInfo: {}", e)))
}

/// Parse an error document in either encoding
pub(crate) fn parse_fault(body: &str) -> Option<ApiFault> {
    let body = body.trim();
    if body.starts_with('<') {
        quick_xml::de::from_str(body).ok()
    } else if body.starts_with('{') {
        serde_json::from_str(body).ok()
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_job_request_escapes_object() {
        let body = create_job_request("Load<__c>", ContentType::Csv);
        assert!(body.contains("<object>Load&lt;__c&gt;</object>"));
        assert!(body.contains("<contentType>CSV</contentType>"));
        assert!(body.contains("<operation>insert</operation>"));
    }

    #[test]
    fn test_parse_job_info() {
        let info = parse_job_info(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <jobInfo xmlns="http://www.force.com/2009/06/asyncapi/dataload">
                <id>750R0000000zlh9IAA</id>
                <operation>insert</operation>
                <object>Load__c</object>
                <state>Open</state>
                <contentType>CSV</contentType>
            </jobInfo>"#,
        )
        .unwrap();

        assert_eq!(info.id, "750R0000000zlh9IAA");
        assert_eq!(info.state.as_deref(), Some("Open"));
    }

    #[test]
    fn test_parse_batch_info_xml_and_json() {
        let xml = parse_batch_info(
            r#"<batchInfo xmlns="http://www.force.com/2009/06/asyncapi/dataload">
                <id>751R0000000abcdIAA</id>
                <jobId>750R0000000zlh9IAA</jobId>
                <state>Completed</state>
                <numberRecordsProcessed>3</numberRecordsProcessed>
                <numberRecordsFailed>1</numberRecordsFailed>
            </batchInfo>"#,
            ContentType::Csv,
        )
        .unwrap();
        assert_eq!(xml.state, "Completed");
        assert_eq!(xml.number_records_processed, 3);
        assert_eq!(xml.number_records_failed, 1);

        let json = parse_batch_info(
            r#"{"id":"751R0000000abcdIAA","jobId":"750R0000000zlh9IAA","state":"InProgress","numberRecordsProcessed":0}"#,
            ContentType::Json,
        )
        .unwrap();
        assert_eq!(json.state, "InProgress");
        assert_eq!(json.state_message, None);
    }

    #[test]
    fn test_parse_fault() {
        let fault = parse_fault(
            r#"<error xmlns="http://www.force.com/2009/06/asyncapi/dataload">
                <exceptionCode>InvalidSessionId</exceptionCode>
                <exceptionMessage>Invalid session id</exceptionMessage>
            </error>"#,
        )
        .unwrap();
        assert_eq!(fault.exception_code, "InvalidSessionId");

        let fault = parse_fault(r#"{"exceptionCode":"InvalidBatch","exceptionMessage":"bad"}"#).unwrap();
        assert_eq!(fault.exception_message, "bad");

        assert!(parse_fault("Not Found").is_none());
        assert!(parse_fault("<html><body>404</body></html>").is_none());
    }
}
