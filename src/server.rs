use log::{info, warn};
use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::config::Settings;
use crate::error::ServeError;
use crate::file_serving::handlers::StaticFiles;
use crate::http::{reason_phrase, Handler, NotFoundHandler, Request, Response, Route};
use crate::{log_error, log_request, log_response};

/// The mounted handler chain behind one route.
pub struct App {
    route: Route,
    handler: Box<dyn Handler>,
}

impl App {
    pub fn new(route: Route, handler: Box<dyn Handler>) -> Self {
        Self { route, handler }
    }

    /// Builds `primary -> [fallback_dir] -> not found`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ServeError> {
        let mut next: Box<dyn Handler> = Box::new(NotFoundHandler);
        if let Some(config) = settings.fallback_config()? {
            info!("Fallback directory: {}", config.root.display());
            next = Box::new(StaticFiles::new(config, next)?);
        }

        let config = settings.static_config()?;
        if !config.root.is_dir() {
            warn!("Root {} is not a directory", config.root.display());
        }
        let handler = StaticFiles::new(config, next)?;
        Ok(Self::new(Route::new(&settings.route), Box::new(handler)))
    }

    pub fn dispatch(&self, request: Request) -> Response {
        if request.method != "GET" && !request.is_head() {
            return Response::text(405, reason_phrase(405)).with_header("Allow", "GET, HEAD");
        }

        let context = format!("{} {}", request.method, request.target);
        let Some(request) = self.route.bind(request) else {
            return Response::text(404, reason_phrase(404));
        };

        match self.handler.handle(&request) {
            Ok(response) => response,
            Err(e) => {
                if e.status() >= 500 {
                    log_error!(e, context);
                } else {
                    warn!("{} - {}", context, e);
                }
                Response::from_error(&e)
            }
        }
    }
}

pub struct Server {
    listener: TcpListener,
    app: Arc<App>,
}

impl Server {
    pub fn bind(settings: &Settings) -> io::Result<Self> {
        let app = App::from_settings(settings)?;
        let listener = TcpListener::bind(&settings.listen_addr)?;
        Ok(Self {
            listener,
            app: Arc::new(app),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts forever, one thread per connection.
    pub fn run(self) -> io::Result<()> {
        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(stream) => stream,
                Err(e) => {
                    log_error!(e, "Failed to accept connection");
                    continue;
                }
            };
            let app = Arc::clone(&self.app);

            thread::spawn(move || {
                if let Err(e) = handle_connection(stream, &app) {
                    log_error!(e, "Error handling connection");
                }
            });
        }

        Ok(())
    }
}

pub fn start_server(settings: Settings) -> io::Result<()> {
    let server = Server::bind(&settings)?;
    info!("Listening on: {}", server.local_addr()?);
    info!(
        "Serving directory {} under {}",
        settings.root.display(),
        settings.route
    );
    server.run()
}

fn handle_connection(mut client: TcpStream, app: &App) -> io::Result<()> {
    let start_time = Instant::now();
    let request = Request::read_from(&mut BufReader::new(&client));
    let request = match request {
        Ok(request) => request,
        Err(e) if e.kind() == io::ErrorKind::InvalidData => {
            Response::text(400, reason_phrase(400)).write_to(&mut client, true)?;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    log_request!(request);
    let include_body = !request.is_head();
    let response = app.dispatch(request);
    log_response!(response, start_time.elapsed());
    response.write_to(&mut client, include_body)
}
