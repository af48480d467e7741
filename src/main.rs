use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    posterized::cli::main()
}
