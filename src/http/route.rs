use crate::connectivity::ConnectivityMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Index,
    Script,
    Signal,
    Params,
    SaveWifi,
    FactoryReset,
    Status,
    PowerOff,
    /// Unregistered path while provisioning; answered with a redirect to `/`.
    CaptiveRedirect,
    MethodNotAllowed,
    NotFound,
}

const ROUTES: [(&str, &str, Route); 8] = [
    ("GET", "/", Route::Index),
    ("GET", "/index.js", Route::Script),
    ("GET", "/signal", Route::Signal),
    ("POST", "/params", Route::Params),
    ("POST", "/api/save_wifi", Route::SaveWifi),
    ("POST", "/api/factory_reset", Route::FactoryReset),
    ("GET", "/api/status", Route::Status),
    ("GET", "/poweroff", Route::PowerOff),
];

impl Route {
    pub fn resolve(method: &str, path: &str, mode: ConnectivityMode) -> Self {
        let mut path_known = false;
        for (route_method, route_path, route) in ROUTES {
            if route_path != path {
                continue;
            }
            if route_method.eq_ignore_ascii_case(method) {
                return route;
            }
            path_known = true;
        }

        if path_known {
            Self::MethodNotAllowed
        } else if matches!(mode, ConnectivityMode::Provisioning) {
            Self::CaptiveRedirect
        } else {
            Self::NotFound
        }
    }
}
