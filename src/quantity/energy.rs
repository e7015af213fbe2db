quantity!(KilowattHours, "kWh", 3);
