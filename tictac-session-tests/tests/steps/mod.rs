mod game_rules_steps;
mod replica_sync_steps;
