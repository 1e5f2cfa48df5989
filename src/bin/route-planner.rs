use delivery_planner::runner;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    runner::run()
}
