//! Console destination - bulks go to stdout

use crate::output::Destination;

pub fn console_destination() -> Destination {
    Destination::stdout()
}
