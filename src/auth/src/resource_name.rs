// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

const PROJECTS: &str = "projects";
const SERVICE_ACCOUNTS: &str = "serviceAccounts";

/// Returns the [resource name] for a service account.
///
/// The IAM Credentials service identifies service accounts by resource names
/// of the form `projects/{project}/serviceAccounts/{account}`, where the
/// project may be the `-` wildcard. Names already in this form are returned
/// unchanged, anything else is treated as a service account email or unique
/// id.
///
/// ```
/// # use google_cloud_auth_impersonate::resource_name::service_account_resource_name;
/// assert_eq!(
///     service_account_resource_name("sa@my-project.iam.gserviceaccount.com"),
///     "projects/-/serviceAccounts/sa@my-project.iam.gserviceaccount.com"
/// );
/// assert_eq!(
///     service_account_resource_name("projects/my-project/serviceAccounts/123456"),
///     "projects/my-project/serviceAccounts/123456"
/// );
/// ```
///
/// [resource name]: https://google.aip.dev/122
pub fn service_account_resource_name(identity: &str) -> String {
    if is_service_account_resource_name(identity) {
        return identity.to_string();
    }
    format!("{PROJECTS}/-/{SERVICE_ACCOUNTS}/{identity}")
}

fn is_service_account_resource_name(name: &str) -> bool {
    let segments = name.split('/').collect::<Vec<_>>();
    matches!(
        segments.as_slice(),
        [PROJECTS, project, SERVICE_ACCOUNTS, account] if !project.is_empty() && !account.is_empty()
    )
}
