use reqwest::multipart::Form;
use serde_json::{json, Value};

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{Credentials, DashboardData, Period};

/// Status filter value that means "no filter".
pub const ALL_STATUSES: &str = "all";

async fn fetch_list(client: &ApiClient, path: &str, status: &str) -> ApiResult<Vec<Value>> {
    let value = if status == ALL_STATUSES {
        client.get(path).await?
    } else {
        client.get_with_query(path, &[("status", status)]).await?
    };
    into_list(path, value)
}

fn into_list(path: &str, value: Value) -> ApiResult<Vec<Value>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items),
        other => Err(ApiError::UnexpectedShape {
            path: path.to_string(),
            reason: format!("expected a JSON array, got {}", kind(&other)),
        }),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// auth

pub async fn login(client: &ApiClient, credentials: &Credentials) -> ApiResult<Value> {
    client.post("/auth/login", credentials).await
}

pub async fn verify_2fa_pin(
    client: &ApiClient,
    email: &str,
    pin: &str,
    token: &str,
) -> ApiResult<Value> {
    client
        .post_with_bearer("/auth/2fa/pin/verify", &json!({ "email": email, "pin": pin }), token)
        .await
}

pub async fn forgot_password(client: &ApiClient, email: &str) -> ApiResult<Value> {
    client
        .post("/auth/forgot-password/", &json!({ "email": email }))
        .await
}

pub async fn reset_password(client: &ApiClient, token: &str, password: &str) -> ApiResult<Value> {
    let path = format!("/auth/reset-password/{}", urlencoding::encode(token));
    client.post(&path, &json!({ "password": password })).await
}

// customers

pub async fn fetch_customers(client: &ApiClient, status: &str) -> ApiResult<Vec<Value>> {
    fetch_list(client, "/users/customers", status).await
}

pub async fn add_customer(client: &ApiClient, customer: &Value) -> ApiResult<Value> {
    client.post("/users/customers", customer).await
}

pub async fn update_customer_status(
    client: &ApiClient,
    email: &str,
    status: &str,
) -> ApiResult<Value> {
    client
        .patch(
            "/users/customers/status",
            &json!({ "email": email, "status": status }),
        )
        .await
}

/// Customers and providers share the same delete endpoint.
pub async fn delete_user(client: &ApiClient, user_id: &str) -> ApiResult<Value> {
    client.delete(&format!("/users/{}", urlencoding::encode(user_id))).await
}

// providers

pub async fn fetch_providers(client: &ApiClient, status: &str) -> ApiResult<Vec<Value>> {
    fetch_list(client, "/users/providers", status).await
}

pub async fn fetch_provider_services(
    client: &ApiClient,
    provider_id: &str,
) -> ApiResult<Vec<Value>> {
    let path = format!("/services/provider/{}", urlencoding::encode(provider_id));
    let value = client.get(&path).await?;
    into_list(&path, value)
}

/// Providers are created from a multipart form (documents may be attached upstream).
pub async fn add_provider(client: &ApiClient, fields: &[(String, String)]) -> ApiResult<Value> {
    let form = fields
        .iter()
        .fold(Form::new(), |form, (name, value)| {
            form.text(name.clone(), value.clone())
        });
    client.post_multipart("/users/providers", form).await
}

pub async fn update_provider_status(
    client: &ApiClient,
    email: &str,
    status: &str,
) -> ApiResult<Value> {
    client
        .patch(
            "/users/providers/status",
            &json!({ "email": email, "status": status }),
        )
        .await
}

// bookings

pub async fn fetch_bookings(client: &ApiClient, status: &str) -> ApiResult<Vec<Value>> {
    fetch_list(client, "/bookings", status).await
}

pub async fn fetch_booking(client: &ApiClient, booking_id: &str) -> ApiResult<Value> {
    client
        .get(&format!("/bookings/{}", urlencoding::encode(booking_id)))
        .await
}

pub async fn create_booking(client: &ApiClient, booking: &Value) -> ApiResult<Value> {
    client.post("/bookings", booking).await
}

pub async fn update_booking(
    client: &ApiClient,
    booking_id: &str,
    booking: &Value,
) -> ApiResult<Value> {
    client
        .put(&format!("/bookings/{}", urlencoding::encode(booking_id)), booking)
        .await
}

pub async fn update_booking_status(
    client: &ApiClient,
    booking_id: &str,
    status: &str,
) -> ApiResult<Value> {
    client
        .patch(
            &format!("/bookings/{}/status", urlencoding::encode(booking_id)),
            &json!({ "status": status }),
        )
        .await
}

pub async fn delete_booking(client: &ApiClient, booking_id: &str) -> ApiResult<Value> {
    client
        .delete(&format!("/bookings/{}", urlencoding::encode(booking_id)))
        .await
}

// payments

pub async fn fetch_payments(client: &ApiClient, status: &str) -> ApiResult<Vec<Value>> {
    fetch_list(client, "/payments", status).await
}

pub async fn fetch_payment(client: &ApiClient, payment_id: &str) -> ApiResult<Value> {
    client
        .get(&format!("/payments/{}", urlencoding::encode(payment_id)))
        .await
}

pub async fn refund_payment(client: &ApiClient, payment_id: &str) -> ApiResult<Value> {
    client
        .post_empty(&format!("/payments/{}/refund", urlencoding::encode(payment_id)))
        .await
}

pub async fn create_payment(client: &ApiClient, payment: &Value) -> ApiResult<Value> {
    client.post("/payments", payment).await
}

pub async fn update_payment(
    client: &ApiClient,
    payment_id: &str,
    payment: &Value,
) -> ApiResult<Value> {
    client
        .put(&format!("/payments/{}", urlencoding::encode(payment_id)), payment)
        .await
}

pub async fn delete_payment(client: &ApiClient, payment_id: &str) -> ApiResult<Value> {
    client
        .delete(&format!("/payments/{}", urlencoding::encode(payment_id)))
        .await
}

// categories

pub async fn fetch_categories(client: &ApiClient) -> ApiResult<Vec<Value>> {
    fetch_list(client, "/categories", ALL_STATUSES).await
}

pub async fn add_category(client: &ApiClient, category: &Value) -> ApiResult<Value> {
    client.post("/categories", category).await
}

pub async fn update_category(
    client: &ApiClient,
    category_id: &str,
    category: &Value,
) -> ApiResult<Value> {
    client
        .put(&format!("/categories/{}", urlencoding::encode(category_id)), category)
        .await
}

pub async fn delete_category(client: &ApiClient, category_id: &str) -> ApiResult<Value> {
    client
        .delete(&format!("/categories/{}", urlencoding::encode(category_id)))
        .await
}

pub async fn fetch_subcategories(client: &ApiClient, category_id: &str) -> ApiResult<Vec<Value>> {
    let path = format!("/categories/{}/subcategories", urlencoding::encode(category_id));
    let value = client.get(&path).await?;
    into_list(&path, value)
}

pub async fn add_subcategory(
    client: &ApiClient,
    category_id: &str,
    subcategory: &Value,
) -> ApiResult<Value> {
    client
        .post(
            &format!("/categories/{}/subcategories", urlencoding::encode(category_id)),
            subcategory,
        )
        .await
}

pub async fn update_subcategory(
    client: &ApiClient,
    subcategory_id: &str,
    subcategory: &Value,
) -> ApiResult<Value> {
    client
        .put(
            &format!("/categories/subcategories/{}", urlencoding::encode(subcategory_id)),
            subcategory,
        )
        .await
}

pub async fn delete_subcategory(client: &ApiClient, subcategory_id: &str) -> ApiResult<Value> {
    client
        .delete(&format!(
            "/categories/subcategories/{}",
            urlencoding::encode(subcategory_id)
        ))
        .await
}

// settings

pub async fn fetch_settings(client: &ApiClient) -> ApiResult<Value> {
    client.get("/settings").await
}

pub async fn update_settings(client: &ApiClient, settings: &Value) -> ApiResult<Value> {
    client.put("/settings", settings).await
}

// dashboard

/// Fetches customers, providers and categories concurrently; any failure fails the whole.
pub async fn fetch_dashboard_data(client: &ApiClient) -> ApiResult<DashboardData> {
    let (customers, providers, categories) = tokio::try_join!(
        fetch_customers(client, ALL_STATUSES),
        fetch_providers(client, ALL_STATUSES),
        fetch_categories(client),
    )?;
    Ok(DashboardData {
        customers,
        providers,
        categories,
    })
}

/// Server-side aggregate stats, returned verbatim.
pub async fn fetch_dashboard_stats(client: &ApiClient, period: &Period) -> ApiResult<Value> {
    client
        .get_with_query("/dashboard/stats", &[("period", period.as_str())])
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DEFAULT_TIMEOUT;
    use wiremock::matchers::{body_json, body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(server.uri(), DEFAULT_TIMEOUT).unwrap()
    }

    #[tokio::test]
    async fn all_status_sends_no_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "Meron"}])))
            .mount(&server)
            .await;

        let customers = fetch_customers(&client(&server), ALL_STATUSES).await.unwrap();
        assert_eq!(customers.len(), 1);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests[0].url.query(), None);
    }

    #[tokio::test]
    async fn status_filter_becomes_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/payments"))
            .and(query_param("status", "completed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"amount": 10}])))
            .expect(1)
            .mount(&server)
            .await;

        let payments = fetch_payments(&client(&server), "completed").await.unwrap();
        assert_eq!(payments, vec![json!({"amount": 10})]);
    }

    #[tokio::test]
    async fn null_list_is_empty_and_objects_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bookings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let client = client(&server);
        assert!(fetch_bookings(&client, ALL_STATUSES).await.unwrap().is_empty());
        let err = fetch_categories(&client).await.unwrap_err();
        assert!(matches!(err, ApiError::UnexpectedShape { .. }));
    }

    #[tokio::test]
    async fn status_updates_send_email_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/users/providers/status"))
            .and(body_json(json!({"email": "p@example.com", "status": "suspended"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "suspended"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/bookings/b-7/status"))
            .and(body_json(json!({"status": "confirmed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"_id": "b-7"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server);
        update_provider_status(&client, "p@example.com", "suspended")
            .await
            .unwrap();
        update_booking_status(&client, "b-7", "confirmed").await.unwrap();
    }

    #[tokio::test]
    async fn user_ids_are_percent_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": true})))
            .mount(&server)
            .await;

        delete_user(&client(&server), "a b/c@d.e_f-g~!*'()").await.unwrap();

        let requests = server.received_requests().await.unwrap();
        // only RFC 3986 unreserved characters survive; sub-delims are escaped
        assert_eq!(
            requests[0].url.path(),
            "/users/a%20b%2Fc%40d.e_f-g~%21%2A%27%28%29"
        );
    }

    #[tokio::test]
    async fn refund_posts_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/pay-1/refund"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "refunded"})))
            .expect(1)
            .mount(&server)
            .await;

        let refunded = refund_payment(&client(&server), "pay-1").await.unwrap();
        assert_eq!(refunded["status"], json!("refunded"));
    }

    #[tokio::test]
    async fn provider_form_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/providers"))
            .and(body_string_contains("name=\"businessName\""))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"_id": "p-9"})))
            .expect(1)
            .mount(&server)
            .await;

        let fields = vec![("businessName".to_string(), "Sparkle".to_string())];
        let created = add_provider(&client(&server), &fields).await.unwrap();
        assert_eq!(created["_id"], json!("p-9"));
    }

    #[tokio::test]
    async fn dashboard_fetches_three_collections() {
        let server = MockServer::start().await;
        for (route, body) in [
            ("/users/customers", json!([{"_id": "c1"}, {"_id": "c2"}])),
            ("/users/providers", json!([{"_id": "p1"}])),
            ("/categories", json!([])),
        ] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .mount(&server)
                .await;
        }

        let data = fetch_dashboard_data(&client(&server)).await.unwrap();
        assert_eq!(data.customers.len(), 2);
        assert_eq!(data.providers.len(), 1);
        assert!(data.categories.is_empty());
    }

    #[tokio::test]
    async fn dashboard_fails_when_any_fetch_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/customers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/providers"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"message": "down"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = fetch_dashboard_data(&client(&server)).await.unwrap_err();
        assert_eq!(err.message(), "down");
    }

    #[tokio::test]
    async fn reset_password_puts_token_in_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/reset-password/abc123"))
            .and(body_json(json!({"password": "n3w-secret"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        reset_password(&client(&server), "abc123", "n3w-secret")
            .await
            .unwrap();
    }
}
