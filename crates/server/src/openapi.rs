use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(utoipa::ToSchema)]
pub struct ClassRoomInputDoc {
    pub name: String,
    pub room_number: String,
    pub current_capacity: Option<i32>,
    pub max_capacity: Option<i32>,
}

#[derive(utoipa::ToSchema)]
pub struct CourseInputDoc {
    pub title: String,
    pub level: String,
    pub prerequisites: Option<String>,
    pub min_capacity: i32,
    pub max_capacity: i32,
    pub current_capacity: Option<i32>,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    /// PLANNED | IN_PROGRESS | COMPLETED | CANCELLED
    pub status: String,
    pub trainer_id: Option<i64>,
}

#[derive(utoipa::ToSchema)]
pub struct StudentInputDoc {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub level: String,
    pub course_id: Option<i64>,
    pub classroom_id: Option<i64>,
}

#[derive(utoipa::ToSchema)]
pub struct TrainerInputDoc {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub specialty: String,
    pub classroom_id: Option<i64>,
}

/// Error envelope returned by every failing route.
#[derive(utoipa::ToSchema)]
pub struct ErrorResponseDoc {
    pub timestamp: String,
    pub status: u16,
    pub message: String,
    pub code: Option<String>,
    pub errors: Option<Vec<String>>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::classrooms::create,
        crate::routes::classrooms::get_by_id,
        crate::routes::classrooms::list,
        crate::routes::classrooms::update,
        crate::routes::classrooms::remove,
        crate::routes::classrooms::search,
        crate::routes::classrooms::available,
        crate::routes::classrooms::empty,
        crate::routes::classrooms::without_trainers,
        crate::routes::classrooms::add_student,
        crate::routes::classrooms::remove_student,
        crate::routes::courses::create,
        crate::routes::courses::get_by_id,
        crate::routes::courses::list,
        crate::routes::courses::update,
        crate::routes::courses::remove,
        crate::routes::courses::search,
        crate::routes::courses::date_range,
        crate::routes::courses::by_trainer,
        crate::routes::courses::by_level,
        crate::routes::courses::by_status,
        crate::routes::courses::available,
        crate::routes::courses::upcoming,
        crate::routes::courses::ongoing,
        crate::routes::courses::without_trainer,
        crate::routes::courses::by_capacity,
        crate::routes::courses::enroll,
        crate::routes::courses::withdraw,
        crate::routes::students::create,
        crate::routes::students::get_by_id,
        crate::routes::students::list,
        crate::routes::students::update,
        crate::routes::students::remove,
        crate::routes::students::search,
        crate::routes::students::by_level,
        crate::routes::students::by_course,
        crate::routes::students::by_classroom,
        crate::routes::students::by_name,
        crate::routes::trainers::create,
        crate::routes::trainers::get_by_id,
        crate::routes::trainers::list,
        crate::routes::trainers::update,
        crate::routes::trainers::remove,
        crate::routes::trainers::search,
        crate::routes::trainers::by_email,
        crate::routes::trainers::by_specialty,
        crate::routes::trainers::by_name,
        crate::routes::trainers::by_classroom,
        crate::routes::trainers::available,
        crate::routes::trainers::without_courses,
    ),
    components(
        schemas(
            HealthResponse,
            ClassRoomInputDoc,
            CourseInputDoc,
            StudentInputDoc,
            TrainerInputDoc,
            ErrorResponseDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "classrooms", description = "Classroom management"),
        (name = "courses", description = "Course management"),
        (name = "students", description = "Student management"),
        (name = "trainers", description = "Trainer management")
    )
)]
pub struct ApiDoc;
