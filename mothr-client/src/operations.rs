//! Operation documents understood by the job service

use mothr_core::domain::job::JobField;
use mothr_core::dto::job::JobSpec;

use crate::error::Result;
use crate::transport::Operation;

const LOGIN: &str = "mutation Login($username: String!, $password: String!) { \
    login(username: $username, password: $password) { token refresh } }";

const REFRESH: &str = "mutation Refresh($token: String!) { refresh(token: $token) { token } }";

const SUBMIT_JOB: &str = "mutation SubmitJob($request: JobRequestInput!) { \
    submitJob(request: $request) { job { jobId status } } }";

const JOB_COMPLETE: &str = "subscription JobComplete($jobId: String!) { \
    subscribeJobComplete(jobId: $jobId) { jobId service status result error } }";

const JOB_MESSAGES: &str =
    "subscription JobMessages($jobId: String!) { subscribeJobMessages(jobId: $jobId) }";

const SERVICES: &str = "query Services { services { name version } }";

const SERVICE: &str = "query Service($name: String!) { \
    service(name: $name) { name version parameters { name fileType { name } } } }";

pub(crate) fn login(username: &str, password: &str) -> Operation {
    Operation::new(LOGIN)
        .variable("username", username)
        .variable("password", password)
}

pub(crate) fn refresh(token: &str) -> Operation {
    Operation::new(REFRESH).variable("token", token)
}

pub(crate) fn submit_job(spec: &JobSpec) -> Result<Operation> {
    Ok(Operation::new(SUBMIT_JOB).variable("request", serde_json::to_value(spec)?))
}

pub(crate) fn job(job_id: &str, fields: &[JobField]) -> Operation {
    let query = format!(
        "query Job($jobId: String!) {{ job(jobId: $jobId) {{ {} }} }}",
        JobField::selection(fields)
    );
    Operation::new(query).variable("jobId", job_id)
}

pub(crate) fn job_complete(job_id: &str) -> Operation {
    Operation::new(JOB_COMPLETE).variable("jobId", job_id)
}

pub(crate) fn job_messages(job_id: &str) -> Operation {
    Operation::new(JOB_MESSAGES).variable("jobId", job_id)
}

pub(crate) fn services() -> Operation {
    Operation::new(SERVICES)
}

pub(crate) fn service(name: &str) -> Operation {
    Operation::new(SERVICE).variable("name", name)
}
