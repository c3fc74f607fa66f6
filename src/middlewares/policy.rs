use crate::model::user::Role;

/// Protected operations. Routes that only need a signed-in user carry no action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ViewCameras,
    ManageCameras,
    UploadVideo,
    CreateIncident,
    UpdateIncidentStatus,
    AssignIncident,
    ConfigureAi,
    ViewReports,
    GenerateReports,
    ManagePayouts,
    DeletePayouts,
    ManageManagers,
}

const ADMIN: &[Role] = &[Role::Admin];

impl Action {
    pub fn allowed_roles(&self) -> &'static [Role] {
        match self {
            Action::ViewCameras | Action::UploadVideo => &[Role::Admin, Role::Camera],
            Action::ManageCameras => ADMIN,
            Action::CreateIncident => &[Role::Admin, Role::Ai],
            Action::UpdateIncidentStatus => &[Role::Admin, Role::Camera, Role::Ai],
            Action::AssignIncident => ADMIN,
            Action::ConfigureAi => ADMIN,
            Action::ViewReports => &[Role::Admin, Role::Reporting, Role::Analyst],
            Action::GenerateReports => &[Role::Admin, Role::Reporting],
            Action::ManagePayouts => &[Role::Admin, Role::Payroll],
            Action::DeletePayouts => ADMIN,
            Action::ManageManagers => ADMIN,
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles().contains(&role)
    }
}
