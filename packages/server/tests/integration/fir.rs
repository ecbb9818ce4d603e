use std::sync::Arc;
use std::sync::atomic::Ordering;

use ::common::Severity;
use serde_json::json;

use crate::common::{FakeClassifier, TestApp, TestOptions, routes};

async fn app_with_classifier(answer: Option<Severity>) -> (TestApp, Arc<FakeClassifier>) {
    let classifier = Arc::new(FakeClassifier::answering(answer));
    let app = TestApp::spawn_with(TestOptions {
        classifier: Some(classifier.clone()),
        ..Default::default()
    })
    .await;
    (app, classifier)
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn classifier_high_priority_becomes_severity_three() {
        let (app, classifier) = app_with_classifier(Some(Severity::High)).await;

        let res = app
            .post(
                routes::UPLOAD,
                &json!({"title": "Theft", "description": "laptop stolen from office"}),
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["severity"], 3);
        assert_eq!(res.body["recordId"], 1);
        assert_eq!(res.body["firNumber"], "FIR2024000001");
        assert!(res.body["txHash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

        let entries = app.ledger.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Theft");
        assert_eq!(entries[0].description, "laptop stolen from office");
        assert_eq!(entries[0].severity, 3);
        assert_eq!(entries[0].blob_hash, res.body["ipfsHash"]);

        let pinned = app.blobs.document(&entries[0].blob_hash).unwrap();
        assert_eq!(pinned["severity"], 3);
        assert_eq!(pinned["title"], "Theft");
    }

    #[tokio::test]
    async fn classifier_medium_priority_becomes_severity_two() {
        let (app, _) = app_with_classifier(Some(Severity::Medium)).await;
        let res = app
            .post(routes::UPLOAD, &json!({"description": "wallet pickpocketed"}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["severity"], 2);
        assert_eq!(app.ledger.entries()[0].title, "Untitled FIR");
    }

    #[tokio::test]
    async fn classifier_failure_defaults_to_severity_one() {
        let (app, classifier) = app_with_classifier(None).await;
        let res = app
            .post(routes::UPLOAD, &json!({"description": "noise at night"}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["severity"], 1);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(app.ledger.entries()[0].severity, 1);
    }

    #[tokio::test]
    async fn missing_classifier_defaults_to_severity_one() {
        let app = TestApp::spawn().await;
        let res = app
            .post(routes::UPLOAD, &json!({"description": "lost keys"}))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["severity"], 1);
    }

    #[tokio::test]
    async fn client_severity_skips_classifier() {
        let (app, classifier) = app_with_classifier(Some(Severity::Low)).await;
        let res = app
            .post(
                routes::UPLOAD,
                &json!({"incidentType": "Assault", "incidentDescription": "attacked", "severity": "3"}),
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["severity"], 3);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
        assert_eq!(app.ledger.entries()[0].title, "Assault");
    }

    #[tokio::test]
    async fn invalid_client_severity_is_classified() {
        let (app, classifier) = app_with_classifier(Some(Severity::Medium)).await;
        let res = app
            .post(
                routes::UPLOAD,
                &json!({"description": "phone snatched", "severity": 9}),
            )
            .await;
        assert_eq!(res.body["severity"], 2);
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rejects_bodies_without_description() {
        let app = TestApp::spawn().await;

        let res = app.post(routes::UPLOAD, &json!({"title": "Theft"})).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app.post(routes::UPLOAD, &json!(["not", "an", "object"])).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        let res = app.post_raw(routes::UPLOAD, "{not json").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");

        assert_eq!(app.blobs.pinned_count(), 0);
        assert!(app.ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn identical_bodies_share_a_cid_but_not_a_transaction() {
        let app = TestApp::spawn().await;
        let body = json!({"title": "Theft", "description": "laptop stolen", "severity": 2});

        let first = app.post(routes::UPLOAD, &body).await;
        let second = app.post(routes::UPLOAD, &body).await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 200, "{}", second.text);
        assert_eq!(first.body["ipfsHash"], second.body["ipfsHash"]);
        assert_ne!(first.body["txHash"], second.body["txHash"]);
        assert_eq!(first.body["recordId"], 1);
        assert_eq!(second.body["recordId"], 2);
        assert_eq!(app.ledger.entries().len(), 2);
        assert_eq!(app.blobs.pinned_count(), 1);
    }

    #[tokio::test]
    async fn failed_pin_writes_nothing_to_the_ledger() {
        let app = TestApp::spawn().await;
        app.blobs.fail_pins.store(true, Ordering::SeqCst);

        let res = app
            .post(routes::UPLOAD, &json!({"description": "laptop stolen"}))
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "UPSTREAM_ERROR");
        assert_eq!(res.body["message"], "Error uploading FIR");
        assert!(res.body["error"].as_str().unwrap().contains("pinning service unavailable"));
        assert_eq!(app.blobs.pinned_count(), 0);
        assert!(app.ledger.entries().is_empty());
    }

    #[tokio::test]
    async fn failed_commit_is_upstream_error_and_leaves_blob_pinned() {
        let app = TestApp::spawn().await;
        app.ledger.fail_commits.store(true, Ordering::SeqCst);

        let res = app
            .post(routes::UPLOAD, &json!({"description": "laptop stolen"}))
            .await;

        assert_eq!(res.status, 500);
        assert_eq!(res.body["message"], "Error saving FIR on blockchain");
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "UPSTREAM_ERROR");
        assert!(res.body["error"].as_str().unwrap().contains("insufficient funds"));
        assert_eq!(app.blobs.pinned_count(), 1);
        assert!(app.ledger.entries().is_empty());
    }
}

mod read {
    use super::*;

    #[tokio::test]
    async fn write_then_read_merges_ledger_and_details() {
        let app = TestApp::spawn().await;
        let res = app
            .post(
                routes::UPLOAD,
                &json!({
                    "title": "Theft",
                    "description": "laptop stolen from office",
                    "severity": 3,
                    "phone": "9876543210",
                    "email": "asha@example.com"
                }),
            )
            .await;
        let id = res.body["recordId"].as_u64().unwrap();

        let res = app.get(&routes::fir(id)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let fir = &res.body["data"];
        assert_eq!(fir["id"], id.to_string());
        assert_eq!(fir["blockchainId"], id);
        assert_eq!(fir["firNumber"], "FIR2024000001");
        assert_eq!(fir["title"], "Theft");
        assert_eq!(fir["description"], "laptop stolen from office");
        assert_eq!(fir["phone"], "9876543210");
        assert_eq!(fir["email"], "asha@example.com");
        assert_eq!(fir["status"], "Under Investigation");
        assert_eq!(fir["filedDate"], "2024-05-01");
        assert_eq!(fir["timeline"].as_array().unwrap().len(), 1);
        assert_eq!(fir["timeline"][0]["officer"], "System Administrator");
        assert_eq!(
            fir["timeline"][0]["description"],
            "FIR registered and stored on blockchain"
        );
    }

    #[tokio::test]
    async fn reads_are_idempotent() {
        let app = TestApp::spawn().await;
        app.seed("Theft", 2, json!({"phone": "111"})).await;
        app.seed("Fraud", 3, json!({"phone": "222"})).await;

        let first = app.get(routes::ALL).await;
        let second = app.get(routes::ALL).await;
        assert_eq!(first.status, 200);
        assert_eq!(first.body, second.body);

        let one = app.get(&routes::fir(2)).await;
        let again = app.get(&routes::fir(2)).await;
        assert_eq!(one.body, again.body);
    }

    #[tokio::test]
    async fn list_skips_records_with_unavailable_details() {
        let app = TestApp::spawn().await;
        app.seed("One", 1, json!({"n": 1})).await;
        let broken = app.seed("Two", 1, json!({"n": 2})).await;
        app.seed("Three", 1, json!({"n": 3})).await;
        app.blobs.make_unavailable(&app.blob_hash(broken));

        let res = app.get(routes::ALL).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total"], 2);
        let ids: Vec<_> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|fir| fir["blockchainId"].as_u64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[tokio::test]
    async fn list_of_empty_ledger_is_empty() {
        let app = TestApp::spawn().await;
        let res = app.get(routes::ALL).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["success"], true);
        assert_eq!(res.body["total"], 0);
        assert_eq!(res.body["data"], json!([]));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let app = TestApp::spawn().await;
        app.seed("Theft", 1, json!({})).await;

        let res = app.get(&routes::fir(999)).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["success"], false);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn non_numeric_id_is_rejected() {
        let app = TestApp::spawn().await;
        let res = app.get(&routes::fir("abc")).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn single_record_with_unavailable_details_is_partial() {
        let app = TestApp::spawn().await;
        let id = app.seed("Theft", 1, json!({"phone": "123"})).await;
        app.blobs.make_unavailable(&app.blob_hash(id));

        let res = app.get(&routes::fir(id)).await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"], "PARTIAL_RECORD");
        assert!(res.body["data"].is_null());
    }

    #[tokio::test]
    async fn details_cannot_spoof_identity_or_status() {
        let app = TestApp::spawn().await;
        let id = app
            .seed(
                "Theft",
                1,
                json!({
                    "id": "777",
                    "firNumber": "FIR1999000777",
                    "status": "Case Closed",
                    "title": "Theft of laptop (details)"
                }),
            )
            .await;

        let res = app.get(&routes::fir(id)).await;
        let fir = &res.body["data"];
        assert_eq!(fir["id"], "1");
        assert_eq!(fir["firNumber"], "FIR2024000001");
        assert_eq!(fir["status"], "FIR Registered");
        assert_eq!(fir["title"], "Theft of laptop (details)");
    }

    #[tokio::test]
    async fn cached_details_are_not_refetched() {
        let app = TestApp::spawn_with(TestOptions {
            cache_capacity: 16,
            ..Default::default()
        })
        .await;
        app.seed("One", 1, json!({"n": 1})).await;
        app.seed("Two", 2, json!({"n": 2})).await;

        app.get(routes::ALL).await;
        app.get(routes::ALL).await;
        app.get(&routes::fir(1)).await;

        assert_eq!(app.blobs.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn statistics_count_by_status() {
        let app = TestApp::spawn().await;
        app.seed("One", 1, json!({})).await;
        app.seed("Two", 2, json!({"n": 2})).await;
        app.seed("Three", 3, json!({"n": 3})).await;

        let res = app.get(routes::STATISTICS).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(
            res.body["data"],
            json!({"total": 3, "registered": 2, "underInvestigation": 1})
        );
    }
}

mod surface {
    use super::*;

    #[tokio::test]
    async fn banner_and_openapi_are_served() {
        let app = TestApp::spawn().await;

        let res = app.get("/").await;
        assert_eq!(res.status, 200);
        assert_eq!(res.text, server::handlers::health::BANNER);

        let res = app.get(routes::OPENAPI).await;
        assert_eq!(res.status, 200);
        let paths = res.body["paths"].as_object().unwrap();
        for path in [
            "/api/uploadFIR",
            "/api/getAllFIRs",
            "/api/getFIR/{id}",
            "/api/searchFIR",
            "/api/getStatistics",
        ] {
            assert!(paths.contains_key(path), "missing {path}");
        }
    }
}
