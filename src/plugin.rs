//! Plugin contract.

use crate::app::App;
use crate::error::Error;

/// A unit of setup that registers services, routes or middleware into an
/// [`App`].
///
/// `load` runs once, synchronously, from [`App::load`]. Returning an error
/// aborts setup. Closures qualify:
///
/// ```rust
/// use hearth::{App, Config, DefaultFactory, Error};
///
/// let mut app = App::create(DefaultFactory, Config::default());
/// app.load(|app: &mut App| -> Result<(), Error> {
///     app.register("greeting", "hello");
///     Ok(())
/// })
/// .unwrap();
/// ```
pub trait Plugin {
    fn load(&self, app: &mut App) -> Result<(), Error>;
}

impl<F> Plugin for F
where
    F: Fn(&mut App) -> Result<(), Error>,
{
    fn load(&self, app: &mut App) -> Result<(), Error> {
        self(app)
    }
}
