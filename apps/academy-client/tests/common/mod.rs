#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use academy_client::config::Config;
use academy_client::gateway::ReconnectPolicy;
use academy_client::storage::{LocalStorage, MemoryStorage};
use academy_client::toast::ToastQueue;
use academy_client::views::Preset;
use academy_client::AppContext;

pub const STUDENT_EMAIL: &str = "ada@example.com";
pub const STUDENT_PASSWORD: &str = "lovelace";
pub const STUDENT_ID: &str = "stu_ada";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "hunter2";
pub const ADMIN_ID: &str = "adm_root";

#[derive(Clone)]
struct Account {
    id: String,
    role: &'static str,
    password: String,
}

/// In-memory stand-in for the LMS backend: REST envelope routes plus the
/// notification socket.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<Inner>,
}

struct Inner {
    accounts: Mutex<HashMap<String, Account>>,
    sessions: Mutex<HashMap<String, Account>>,
    next_token: AtomicUsize,
    enrollments: Mutex<Vec<Value>>,
    courses: Mutex<Vec<Value>>,
    students: Mutex<Vec<Value>>,
    notifications: Mutex<Vec<Value>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
    auth_frames: Mutex<Vec<Value>>,
    connections: AtomicUsize,
    pushes: broadcast::Sender<String>,
    kick: broadcast::Sender<()>,
}

fn course(id: &str, title: &str, subject: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "description": format!("{title} from first principles"),
        "subject": subject,
        "level": "Beginner",
        "videoUrl": format!("https://video.example/{id}"),
        "thumbnail": format!("https://img.example/{id}.png"),
        "isSuspended": false,
    })
}

impl Backend {
    pub fn new() -> Self {
        let (pushes, _) = broadcast::channel(64);
        let (kick, _) = broadcast::channel(4);

        let mut accounts = HashMap::new();
        accounts.insert(
            STUDENT_EMAIL.to_string(),
            Account {
                id: STUDENT_ID.into(),
                role: "student",
                password: STUDENT_PASSWORD.into(),
            },
        );
        accounts.insert(
            ADMIN_EMAIL.to_string(),
            Account {
                id: ADMIN_ID.into(),
                role: "admin",
                password: ADMIN_PASSWORD.into(),
            },
        );

        let physics = course("c_phys", "Physics 101", "physics");
        let algebra = course("c_alg", "Algebra", "mathematics");
        let enrollments = vec![
            json!({ "_id": "e1", "course": physics, "completed": false, "progress": 40.0 }),
            json!({ "_id": "e2", "course": algebra, "completed": true, "progress": 100.0 }),
        ];
        let students = vec![
            json!({
                "_id": STUDENT_ID,
                "name": "Ada",
                "email": STUDENT_EMAIL,
                "subject": "physics",
                "isSuspended": false,
                "enrolledCourses": enrollments.clone(),
            }),
            json!({
                "_id": "stu_alan",
                "name": "Alan",
                "email": "alan@example.com",
                "subject": "mathematics",
                "isSuspended": false,
                "enrolledCourses": [],
            }),
        ];

        Self {
            inner: Arc::new(Inner {
                accounts: Mutex::new(accounts),
                sessions: Mutex::new(HashMap::new()),
                next_token: AtomicUsize::new(1),
                enrollments: Mutex::new(enrollments),
                courses: Mutex::new(vec![physics, algebra]),
                students: Mutex::new(students),
                notifications: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                failing: Mutex::new(HashSet::new()),
                auth_frames: Mutex::new(Vec::new()),
                connections: AtomicUsize::new(0),
                pushes,
                kick,
            }),
        }
    }

    /// Every REST call seen so far, as `"METHOD /path"`.
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.inner.calls.lock().iter().filter(|c| c.as_str() == call).count()
    }

    /// Make `"METHOD /path"` answer 500 with an error envelope.
    pub fn fail(&self, call: &str) {
        self.inner.failing.lock().insert(call.to_string());
    }

    pub fn add_notification(&self, record: Value) {
        self.inner.notifications.lock().push(record);
    }

    pub fn notifications(&self) -> Vec<Value> {
        self.inner.notifications.lock().clone()
    }

    pub fn enrollments(&self) -> Vec<Value> {
        self.inner.enrollments.lock().clone()
    }

    pub fn students(&self) -> Vec<Value> {
        self.inner.students.lock().clone()
    }

    /// User ids from every authenticate frame received, in order.
    pub fn auth_frames(&self) -> Vec<String> {
        self.inner
            .auth_frames
            .lock()
            .iter()
            .filter_map(|f| f["d"]["user_id"].as_str().map(str::to_string))
            .collect()
    }

    pub fn raw_auth_frames(&self) -> Vec<Value> {
        self.inner.auth_frames.lock().clone()
    }

    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }

    /// Send a dispatch frame to every open socket.
    pub fn push(&self, event: &str, data: Value) {
        let frame = json!({ "op": 0, "t": event, "s": 1, "d": data });
        let _ = self.inner.pushes.send(frame.to_string());
    }

    /// Drop every open socket without a close frame.
    pub fn kick(&self) {
        let _ = self.inner.kick.send(());
    }

    fn account(&self, headers: &HeaderMap) -> Option<Account> {
        let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
        let token = cookies
            .split(';')
            .filter_map(|pair| pair.trim().strip_prefix("token="))
            .next()?;
        self.inner.sessions.lock().get(token).cloned()
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn ok(message: &str, data: Value) -> Response {
    Json(json!({ "success": true, "message": message, "data": data })).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": "Not authenticated" })),
    )
        .into_response()
}

async fn record_calls(State(backend): State<Backend>, request: Request, next: Next) -> Response {
    let call = format!("{} {}", request.method(), request.uri().path());
    backend.inner.calls.lock().push(call.clone());
    if backend.inner.failing.lock().contains(&call) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": { "code": "INTERNAL", "message": "Server exploded" } })),
        )
            .into_response();
    }
    next.run(request).await
}

async fn login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let account = backend.inner.accounts.lock().get(email).cloned();
    let Some(account) = account.filter(|a| a.password == password) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response();
    };

    start_session(&backend, account)
}

/// Accepts ID tokens of the form `google:<email>` for known accounts.
async fn google_login(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let email = body["token"].as_str().and_then(|t| t.strip_prefix("google:"));
    let account = email.and_then(|e| backend.inner.accounts.lock().get(e).cloned());
    let Some(account) = account else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Invalid Google token" })),
        )
            .into_response();
    };
    start_session(&backend, account)
}

fn start_session(backend: &Backend, account: Account) -> Response {
    let token = format!("tok{}", backend.inner.next_token.fetch_add(1, Ordering::SeqCst));
    backend.inner.sessions.lock().insert(token.clone(), account);
    (
        [(header::SET_COOKIE, format!("token={token}; Path=/; HttpOnly"))],
        Json(json!({ "success": true, "message": "Login successful" })),
    )
        .into_response()
}

async fn logout(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if let Some(token) = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|c| c.split(';').find_map(|p| p.trim().strip_prefix("token=")))
    {
        backend.inner.sessions.lock().remove(token);
    }
    (
        [(header::SET_COOKIE, "token=; Path=/; Max-Age=0".to_string())],
        Json(json!({ "success": true, "message": "Logged out" })),
    )
        .into_response()
}

async fn register(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let mut accounts = backend.inner.accounts.lock();
    if accounts.contains_key(&email) {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "success": false, "error": "Email already registered" })),
        )
            .into_response();
    }
    let id = format!("stu_{}", accounts.len());
    accounts.insert(
        email,
        Account {
            id,
            role: "student",
            password: body["password"].as_str().unwrap_or_default().to_string(),
        },
    );
    (StatusCode::CREATED, Json(json!({ "success": true, "message": "Registered" }))).into_response()
}

async fn verify(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    match backend.account(&headers) {
        Some(account) => ok("", json!({ "_id": account.id, "role": account.role })),
        None => unauthorized(),
    }
}

async fn student_courses(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    if backend.account(&headers).is_none() {
        return unauthorized();
    }
    let enrollments = backend.inner.enrollments.lock().clone();
    ok("", json!({ "enrolledCourses": enrollments }))
}

async fn toggle_completion(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    let mut enrollments = backend.inner.enrollments.lock();
    let Some(enrollment) = enrollments.iter_mut().find(|e| e["course"]["_id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Enrollment not found" })),
        )
            .into_response();
    };
    let completed = !enrollment["completed"].as_bool().unwrap_or(false);
    enrollment["completed"] = json!(completed);
    enrollment["progress"] = json!(if completed { 100.0 } else { 0.0 });
    ok("Course status updated", enrollment.clone())
}

async fn profile(State(backend): State<Backend>, headers: HeaderMap) -> Response {
    match backend.account(&headers) {
        Some(account) => ok(
            "",
            json!({ "_id": account.id, "name": "Ada", "email": STUDENT_EMAIL, "role": account.role }),
        ),
        None => unauthorized(),
    }
}

async fn change_password(State(backend): State<Backend>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let Some(account) = backend.account(&headers) else {
        return unauthorized();
    };
    if body["oldPassword"].as_str() != Some(account.password.as_str()) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "Current password is incorrect" })),
        )
            .into_response();
    }
    ok("Password changed", Value::Null)
}

async fn list_students(State(backend): State<Backend>) -> Response {
    let students = backend.inner.students.lock().clone();
    ok("", json!(students))
}

async fn get_student(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    let student = backend.inner.students.lock().iter().find(|s| s["_id"] == id).cloned();
    match student {
        Some(student) => ok("", student),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Student not found" })),
        )
            .into_response(),
    }
}

async fn delete_student(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    let mut students = backend.inner.students.lock();
    let Some(index) = students.iter().position(|s| s["_id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Student not found" })),
        )
            .into_response();
    };
    let removed = students.remove(index);
    ok("Student deleted", json!({ "name": removed["name"] }))
}

async fn toggle_student(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    let mut students = backend.inner.students.lock();
    let Some(student) = students.iter_mut().find(|s| s["_id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Student not found" })),
        )
            .into_response();
    };
    let suspended = !student["isSuspended"].as_bool().unwrap_or(false);
    student["isSuspended"] = json!(suspended);
    let message = if suspended { "Student suspended" } else { "Student reactivated" };
    ok(message, json!({ "isSuspended": suspended }))
}

/// Every requested student is reported as already holding every course.
async fn assign(State(_): State<Backend>, Json(body): Json<Value>) -> Response {
    let courses = body["courseIds"].as_array().map(Vec::len).unwrap_or(0);
    let results: Vec<Value> = body["studentIds"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|id| json!({ "studentId": id, "alreadyAssigned": courses, "notEnrolled": 0 }))
        .collect();
    ok("Courses assigned", json!({ "results": results }))
}

async fn unassign(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    let course_ids: Vec<String> = body["courseIds"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    let mut students = backend.inner.students.lock();
    let mut results = Vec::new();
    for id in body["studentIds"].as_array().into_iter().flatten() {
        let mut not_enrolled = 0;
        if let Some(student) = students.iter_mut().find(|s| &s["_id"] == id) {
            let enrolled = student["enrolledCourses"].as_array_mut();
            if let Some(enrolled) = enrolled {
                for course_id in &course_ids {
                    let before = enrolled.len();
                    enrolled.retain(|e| e["course"]["_id"] != *course_id);
                    if enrolled.len() == before {
                        not_enrolled += 1;
                    }
                }
            }
        }
        results.push(json!({ "studentId": id, "alreadyAssigned": 0, "notEnrolled": not_enrolled }));
    }
    ok("Courses unassigned", json!({ "results": results }))
}

async fn admin_stats(State(backend): State<Backend>) -> Response {
    let students = backend.inner.students.lock().clone();
    let courses = backend.inner.courses.lock().clone();
    let suspended = |list: &[Value]| list.iter().filter(|v| v["isSuspended"] == true).count();
    ok(
        "",
        json!({
            "totalStudents": students.len(),
            "suspendedStudents": suspended(&students),
            "totalCourses": courses.len(),
            "suspendedCourses": suspended(&courses),
        }),
    )
}

async fn list_courses(State(backend): State<Backend>, Query(query): Query<HashMap<String, String>>) -> Response {
    let limit = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(9usize);
    let courses: Vec<Value> = backend
        .inner
        .courses
        .lock()
        .iter()
        .filter(|c| match query.get("subject") {
            Some(subject) => c["subject"].as_str() == Some(subject.as_str()),
            None => true,
        })
        .cloned()
        .collect();
    let total = courses.len();
    let page: Vec<Value> = courses.into_iter().take(limit).collect();
    ok(
        "",
        json!({ "courses": page, "currentPage": 1, "totalPages": total.div_ceil(limit.max(1)).max(1), "total": total }),
    )
}

async fn create_course(State(backend): State<Backend>, Json(mut body): Json<Value>) -> Response {
    let mut courses = backend.inner.courses.lock();
    body["_id"] = json!(format!("c_new{}", courses.len()));
    body["isSuspended"] = json!(false);
    courses.push(body.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "data": body }))).into_response()
}

async fn update_course(State(backend): State<Backend>, Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    let mut courses = backend.inner.courses.lock();
    let Some(course) = courses.iter_mut().find(|c| c["_id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Course not found" })),
        )
            .into_response();
    };
    if let (Some(course), Some(body)) = (course.as_object_mut(), body.as_object()) {
        for (key, value) in body {
            course.insert(key.clone(), value.clone());
        }
    }
    ok("Course updated", course.clone())
}

async fn delete_course(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    backend.inner.courses.lock().retain(|c| c["_id"] != id);
    ok("Course deleted", Value::Null)
}

async fn toggle_course(State(backend): State<Backend>, Path(id): Path<String>) -> Response {
    let mut courses = backend.inner.courses.lock();
    let Some(course) = courses.iter_mut().find(|c| c["_id"] == id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "message": "Course not found" })),
        )
            .into_response();
    };
    let suspended = !course["isSuspended"].as_bool().unwrap_or(false);
    course["isSuspended"] = json!(suspended);
    let message = if suspended { "Course suspended" } else { "Course activated" };
    Json(json!({ "success": true, "message": message })).into_response()
}

async fn list_notifications(State(backend): State<Backend>, Query(query): Query<HashMap<String, String>>) -> Response {
    if query.get("userId").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "userId is required" })),
        )
            .into_response();
    }
    let records = backend.inner.notifications.lock().clone();
    ok("", json!(records))
}

async fn mark_read(State(backend): State<Backend>, Json(body): Json<Value>) -> Response {
    if body["userId"].as_str().is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "message": "userId is required" })),
        )
            .into_response();
    }
    for record in backend.inner.notifications.lock().iter_mut() {
        record["read"] = json!(true);
    }
    Json(json!({ "success": true })).into_response()
}

async fn gateway(State(backend): State<Backend>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_socket(backend, socket))
}

async fn serve_socket(backend: Backend, mut socket: WebSocket) {
    let mut pushes = backend.inner.pushes.subscribe();
    let mut kick = backend.inner.kick.subscribe();
    backend.inner.connections.fetch_add(1, Ordering::SeqCst);

    loop {
        tokio::select! {
            msg = socket.recv() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Ok(frame) = serde_json::from_str::<Value>(text.as_str()) {
                        backend.inner.auth_frames.lock().push(frame);
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                Some(Ok(_)) => {}
            },
            push = pushes.recv() => match push {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            _ = kick.recv() => return,
        }
    }
}

fn router(backend: Backend) -> Router {
    let api = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/google", post(google_login))
        .route("/auth/logout", post(logout))
        .route("/auth/register", post(register))
        .route("/auth/verify", get(verify))
        .route("/student/courses", get(student_courses))
        .route("/student/toggle-completion/{id}", patch(toggle_completion))
        .route("/profile", get(profile))
        .route("/profile/change-password", post(change_password))
        .route("/admin/students", get(list_students))
        .route("/admin/students/{id}", get(get_student).delete(delete_student))
        .route("/admin/students/toggleSuspension/{id}", put(toggle_student))
        .route("/admin/assign-courses", post(assign))
        .route("/admin/unassign-courses", post(unassign))
        .route("/admin/stats", get(admin_stats))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}", put(update_course).delete(delete_course))
        .route("/courses/{id}/toggle-suspended", patch(toggle_course))
        .route("/notifications", get(list_notifications))
        .route("/notifications/read", put(mark_read));

    Router::new()
        .nest("/api", api)
        .route("/gateway", get(gateway))
        .layer(middleware::from_fn_with_state(backend.clone(), record_calls))
        .with_state(backend)
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestServer {
    pub addr: SocketAddr,
    pub backend: Backend,
}

/// Start the fake backend on an ephemeral port.
pub async fn start_server() -> TestServer {
    let backend = Backend::new();
    let app = router(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer { addr, backend }
}

/// Client configuration pointed at `addr`, with a fast reconnect schedule.
pub fn test_config(addr: SocketAddr) -> Config {
    let mut config = Config::new(&format!("http://{addr}"));
    config.http_timeout = Duration::from_secs(5);
    config.reconnect = ReconnectPolicy {
        base_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(200),
        max_attempts: 3,
        stable_after: Duration::from_secs(1),
    };
    config
}

pub struct TestClient {
    pub ctx: AppContext,
    pub toasts: Arc<ToastQueue>,
    pub storage: Arc<MemoryStorage>,
}

impl TestClient {
    pub fn toast_lines(&self) -> Vec<String> {
        self.toasts.drain().into_iter().map(|t| t.to_string()).collect()
    }
}

pub fn test_client(addr: SocketAddr, confirm: bool) -> TestClient {
    let toasts = Arc::new(ToastQueue::new());
    let storage = Arc::new(MemoryStorage::new());
    let shared: Arc<dyn LocalStorage> = storage.clone();
    let ctx = AppContext::new(test_config(addr), shared, toasts.clone(), Arc::new(Preset(confirm)))
        .expect("client builds");
    TestClient { ctx, toasts, storage }
}

/// Poll `check` until it holds or five seconds pass.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
