use job_portal::models::{
    Account, ApiResponse, ApplicationStatus, DashboardStats, Job, JobView, LoginRequest, Page,
    PageRequest, PaginatedResponse, RegisterRequest, Role, StatusCounts,
};
use serde_json::{Value, json};

// --- Records ---

#[test]
fn test_account_never_carries_a_password_field() {
    let account = Account {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        role: Role::Employer,
        company: Some("Analytical Engines".to_string()),
        ..Account::default()
    };
    let json = serde_json::to_value(&account).unwrap();

    assert_eq!(json["role"], "employer");
    assert_eq!(json["company"], "Analytical Engines");
    assert!(json.get("createdAt").is_some());
    for key in ["password", "passwordHash", "password_hash"] {
        assert!(json.get(key).is_none(), "{key} leaked");
    }
}

#[test]
fn test_job_view_flattens_employer_details() {
    let view = JobView {
        job: Job {
            title: "Backend Engineer".to_string(),
            job_type: "Part-time".to_string(),
            requirements: vec!["Rust".to_string(), "SQL".to_string()],
            ..Job::default()
        },
        employer_name: Some("Grace".to_string()),
        employer_company: None,
    };
    let json = serde_json::to_value(&view).unwrap();

    assert_eq!(json["title"], "Backend Engineer");
    assert_eq!(json["type"], "Part-time");
    assert_eq!(json["requirements"], json!(["Rust", "SQL"]));
    assert_eq!(json["employerName"], "Grace");
    assert!(json["employerCompany"].is_null());
    assert!(json.get("postedDate").is_some());
    assert!(json.get("job").is_none());
}

#[test]
fn test_enums_use_lowercase_literals() {
    assert_eq!(serde_json::to_value(Role::Jobseeker).unwrap(), "jobseeker");
    assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    for status in ApplicationStatus::ALL {
        assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
    }
    assert!(serde_json::from_value::<Role>(json!("Employer")).is_err());
}

// --- Request payloads ---

#[test]
fn test_register_request_tolerates_missing_fields() {
    let request: RegisterRequest = serde_json::from_value(json!({
        "email": "new@example.com",
        "confirmPassword": "secret123"
    }))
    .unwrap();

    assert_eq!(request.email, "new@example.com");
    assert_eq!(request.confirm_password, "secret123");
    assert!(request.name.is_empty());
    assert!(request.password.is_empty());
    assert!(request.role.is_none());

    let login: LoginRequest = serde_json::from_value(json!({})).unwrap();
    assert!(login.email.is_empty());
}

// --- Envelopes ---

#[test]
fn test_message_envelope_omits_data() {
    let json = serde_json::to_value(ApiResponse::message("Logged out successfully")).unwrap();
    assert_eq!(
        json,
        json!({ "status": "success", "message": "Logged out successfully" })
    );

    let json = serde_json::to_value(ApiResponse::success("ok", 42)).unwrap();
    assert_eq!(json["data"], 42);
}

#[test]
fn test_paginated_envelope_shape() {
    let page = Page {
        items: vec!["a", "b"],
        total: 12,
        request: PageRequest { page: 2, limit: 5 },
    };
    let json: Value =
        serde_json::to_value(PaginatedResponse::from_page("Jobs retrieved successfully", page))
            .unwrap();

    assert_eq!(json["status"], "success");
    assert_eq!(json["results"], 2);
    assert_eq!(
        json["pagination"],
        json!({ "totalItems": 12, "totalPages": 3, "currentPage": 2, "limit": 5 })
    );
    assert_eq!(json["data"], json!(["a", "b"]));
}

#[test]
fn test_dashboard_stats_shape() {
    let mut counts = StatusCounts::default();
    counts.add(ApplicationStatus::Pending, 3);
    counts.add(ApplicationStatus::Rejected, 1);
    let stats = DashboardStats {
        total_jobs: 2,
        total_applications: counts.total(),
        applications_by_status: counts,
    };
    let json = serde_json::to_value(&stats).unwrap();

    assert_eq!(json["totalJobs"], 2);
    assert_eq!(json["totalApplications"], 4);
    assert_eq!(
        json["applicationsByStatus"],
        json!({ "pending": 3, "reviewed": 0, "accepted": 0, "rejected": 1 })
    );
}
